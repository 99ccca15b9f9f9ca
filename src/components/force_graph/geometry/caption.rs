//! Fitting node captions inside their circle.

use super::{CaptionLine, TextMeasure};

const ELLIPSIS: char = '\u{2026}';

/// Width of the horizontal chord at vertical offset `offset` from the centre
/// of a circle of `radius`.
fn chord_width(radius: f64, offset: f64) -> f64 {
	2.0 * (radius * radius - offset * offset).max(0.0).sqrt()
}

/// Drop characters two at a time from the end of `text` until
/// `prefix + text + "…"` fits in `max_width`. Gives up at two characters.
fn shrink_to_fit(
	prefix: &str,
	text: &str,
	max_width: f64,
	font_size: f64,
	measure: &dyn TextMeasure,
) -> Option<String> {
	let mut chars: Vec<char> = text.chars().collect();
	loop {
		let candidate: String = prefix
			.chars()
			.chain(chars.iter().copied())
			.chain(std::iter::once(ELLIPSIS))
			.collect();
		if measure.measure(&candidate, font_size) < max_width {
			return Some(candidate);
		}
		if chars.len() <= 2 {
			return None;
		}
		chars.truncate(chars.len() - 2);
	}
}

/// Shorten a single-line caption to `max_width`. Returns the caption and its
/// measured width; an empty caption when nothing readable fits.
pub fn shorten_caption(
	caption: &str,
	max_width: f64,
	font_size: f64,
	measure: &dyn TextMeasure,
) -> (String, f64) {
	let width = measure.measure(caption, font_size);
	if width <= max_width {
		return (caption.to_string(), width);
	}
	match shrink_to_fit("", caption, max_width, font_size, measure) {
		Some(short) => {
			let width = measure.measure(&short, font_size);
			(short, width)
		}
		None => (String::new(), 0.0),
	}
}

struct Candidate {
	lines: Vec<CaptionLine>,
	all_fit: bool,
}

fn fit_on_lines(
	words: &[&str],
	line_count: usize,
	radius: f64,
	font_size: f64,
	measure: &dyn TextMeasure,
) -> Candidate {
	let mut lines = Vec::with_capacity(line_count);
	let mut next = 0;
	let half = line_count as f64 / 2.0;
	for i in 0..line_count {
		let baseline = (1.0 + i as f64 - half) * font_size;
		let containing = if (i as f64) < half {
			baseline - font_size
		} else {
			baseline
		};
		let capacity = chord_width(radius, containing);

		let mut text = String::new();
		while let Some(word) = words.get(next) {
			let candidate = if text.is_empty() {
				(*word).to_string()
			} else {
				format!("{text} {word}")
			};
			if measure.measure(&candidate, font_size) >= capacity {
				break;
			}
			text = candidate;
			next += 1;
		}

		let mut truncated = false;
		if i + 1 == line_count && next < words.len() {
			truncated = true;
			let prefix = if text.is_empty() {
				String::new()
			} else {
				format!("{text} ")
			};
			if let Some(short) = shrink_to_fit(&prefix, words[next], capacity, font_size, measure) {
				text = short;
			}
		}
		lines.push(CaptionLine {
			text,
			baseline,
			truncated,
		});
	}
	Candidate {
		lines,
		all_fit: next >= words.len(),
	}
}

/// Like [`fit_caption`], also returning how many line counts were tried.
pub(crate) fn fit_caption_counting(
	text: &str,
	radius: f64,
	font_size: f64,
	measure: &dyn TextMeasure,
) -> (Vec<CaptionLine>, usize) {
	let words: Vec<&str> = text.split_whitespace().collect();
	if words.is_empty() || font_size <= 0.0 || radius <= 0.0 {
		return (Vec::new(), 0);
	}
	let max_lines = ((2.0 * radius) / font_size).floor().max(1.0) as usize;
	let mut best = Vec::new();
	let mut attempts = 0;
	for line_count in 1..=max_lines {
		attempts += 1;
		let candidate = fit_on_lines(&words, line_count, radius, font_size, measure);
		if candidate.lines.iter().all(|l| !l.text.is_empty()) {
			best = candidate.lines;
			if candidate.all_fit {
				break;
			}
		}
	}
	(best, attempts)
}

/// Break `text` into lines that fit inside a circle of `radius`. Uses the
/// fewest lines that hold every word; if even the tallest stack overflows,
/// its last line ends in an ellipsis.
pub fn fit_caption(
	text: &str,
	radius: f64,
	font_size: f64,
	measure: &dyn TextMeasure,
) -> Vec<CaptionLine> {
	fit_caption_counting(text, radius, font_size, measure).0
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::force_graph::geometry::FixedAdvanceMeasure;

	fn assert_within_circle(lines: &[CaptionLine], radius: f64, font_size: f64) {
		let measure = FixedAdvanceMeasure::default();
		let half = lines.len() as f64 / 2.0;
		for (i, line) in lines.iter().enumerate() {
			let containing = if (i as f64) < half {
				line.baseline - font_size
			} else {
				line.baseline
			};
			let width = measure.measure(&line.text, font_size);
			assert!(
				width < chord_width(radius, containing),
				"line {:?} is {width} wide",
				line.text
			);
		}
	}

	#[test]
	fn short_caption_fits_on_one_line() {
		let lines = fit_caption("Ada", 25.0, 10.0, &FixedAdvanceMeasure::default());
		assert_eq!(lines.len(), 1);
		assert_eq!(lines[0].text, "Ada");
		assert_eq!(lines[0].baseline, 5.0);
		assert!(!lines[0].truncated);
	}

	#[test]
	fn words_wrap_within_chords() {
		let measure = FixedAdvanceMeasure::default();
		let text = "The quick brown fox jumps over the lazy dog";
		for radius in [15.0, 25.0, 40.0, 80.0] {
			let (lines, attempts) = fit_caption_counting(text, radius, 10.0, &measure);
			assert!(attempts as f64 <= (2.0 * radius / 10.0).ceil());
			assert_within_circle(&lines, radius, 10.0);
		}
		let lines = fit_caption(text, 80.0, 10.0, &measure);
		let joined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
		assert_eq!(joined.join(" "), text);
	}

	#[test]
	fn overflowing_word_gets_ellipsis() {
		let measure = FixedAdvanceMeasure::default();
		let lines = fit_caption("Supercalifragilisticexpialidocious", 25.0, 10.0, &measure);
		let last = lines.last().unwrap();
		assert!(last.truncated);
		assert!(last.text.ends_with(ELLIPSIS));
		assert_within_circle(&lines, 25.0, 10.0);
	}

	#[test]
	fn degenerate_inputs_give_no_lines() {
		let measure = FixedAdvanceMeasure::default();
		assert!(fit_caption("", 25.0, 10.0, &measure).is_empty());
		assert!(fit_caption("   ", 25.0, 10.0, &measure).is_empty());
		assert!(fit_caption("Ada", 25.0, 0.0, &measure).is_empty());
		assert!(fit_caption("Ada", 0.0, 10.0, &measure).is_empty());
	}

	#[test]
	fn shorten_keeps_fitting_caption() {
		let measure = FixedAdvanceMeasure::default();
		let (kept, width) = shorten_caption("KNOWS", 100.0, 10.0, &measure);
		assert_eq!(kept, "KNOWS");
		assert!((width - 30.0).abs() < 1e-9);
		let (short, width) = shorten_caption("ACTED_IN_MOVIE", 40.0, 10.0, &measure);
		assert!(short.ends_with(ELLIPSIS));
		assert!(width < 40.0);
		assert_eq!(shorten_caption("ACTED_IN", 5.0, 10.0, &measure), (String::new(), 0.0));
	}

	proptest! {
		#[test]
		fn fitted_lines_stay_inside_the_circle(
			text in "[A-Za-z]{1,14}( [A-Za-z]{1,14}){0,6}",
			radius in 5.0f64..100.0,
			font_size in 6.0f64..16.0,
		) {
			let measure = FixedAdvanceMeasure::default();
			let (lines, attempts) = fit_caption_counting(&text, radius, font_size, &measure);
			let max_lines = ((2.0 * radius) / font_size).floor().max(1.0) as usize;
			prop_assert!(attempts <= max_lines);
			prop_assert!(lines.len() <= max_lines);
			prop_assert!(lines.iter().all(|l| !l.text.is_empty()));
			assert_within_circle(&lines, radius, font_size);
		}

		#[test]
		fn shortened_captions_fit_or_vanish(caption in "[A-Z_]{0,40}", max_width in 0.0f64..200.0) {
			let measure = FixedAdvanceMeasure::default();
			let (short, width) = shorten_caption(&caption, max_width, 10.0, &measure);
			prop_assert!(width <= max_width);
			prop_assert!(short.chars().count() <= caption.chars().count() + 1);
		}
	}
}
