//! Canvas rendering for the graph.
//!
//! Rendering uses three passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. The renderer list over the graph (world space, through [`CanvasSurface`])
//! 3. Vignette (screen space)

use std::f64::consts::TAU;

use web_sys::CanvasRenderingContext2d;

use super::geometry::{PathSegment, Point, TextMeasure};
use super::renderers::Surface;
use super::state::Visualization;
use super::theme::Theme;

/// Renders the complete frame to the canvas.
pub fn render(vis: &Visualization, ctx: &CanvasRenderingContext2d) {
	let (width, height) = (vis.viewport.width, vis.viewport.height);
	draw_background(ctx, &vis.theme, width, height);

	let t = vis.viewport.transform;
	ctx.save();
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);
	vis.draw(&mut CanvasSurface::new(ctx));
	ctx.restore();

	if vis.theme.background.vignette > 0.0 {
		draw_vignette(ctx, &vis.theme, width, height);
	}
}

fn draw_background(ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	let gradient = theme
		.background
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(
				width / 2.0,
				height / 2.0,
				0.0,
				width / 2.0,
				height / 2.0,
				width.max(height) * 0.8,
			)
			.ok()
		})
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}

	ctx.fill_rect(0.0, 0.0, width, height);
}

fn draw_vignette(ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	let Ok(gradient) = ctx.create_radial_gradient(
		width / 2.0,
		height / 2.0,
		width.min(height) * 0.3,
		width / 2.0,
		height / 2.0,
		width.max(height) * 0.7,
	) else {
		return;
	};

	let _ = gradient.add_color_stop(0.0, "rgba(0, 0, 0, 0)");
	let _ = gradient.add_color_stop(1.0, &format!("rgba(0, 0, 0, {})", theme.background.vignette));

	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill_rect(0.0, 0.0, width, height);
}

fn font(font_size: f64) -> String {
	format!("{font_size}px Helvetica Neue, Helvetica, Arial, sans-serif")
}

/// [`Surface`] over a 2D canvas context.
pub struct CanvasSurface<'a> {
	ctx: &'a CanvasRenderingContext2d,
}

impl<'a> CanvasSurface<'a> {
	pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
		Self { ctx }
	}
}

impl Surface for CanvasSurface<'_> {
	fn set_alpha(&mut self, alpha: f64) {
		self.ctx.set_global_alpha(alpha);
	}

	fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
		self.ctx.begin_path();
		let _ = self.ctx.arc(center.x, center.y, radius, 0.0, TAU);
		self.ctx.set_fill_style_str(color);
		self.ctx.fill();
	}

	fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64) {
		self.ctx.begin_path();
		let _ = self.ctx.arc(center.x, center.y, radius, 0.0, TAU);
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.stroke();
	}

	fn stroke_path(&mut self, segments: &[PathSegment], color: &str, width: f64) {
		self.ctx.begin_path();
		let mut pen: Option<Point> = None;
		for segment in segments {
			match *segment {
				PathSegment::Line { from, to } => {
					if pen != Some(from) {
						self.ctx.move_to(from.x, from.y);
					}
					self.ctx.line_to(to.x, to.y);
					pen = Some(to);
				}
				PathSegment::Arc {
					center,
					radius,
					start,
					end,
					anticlockwise,
				} => {
					let _ = self
						.ctx
						.arc_with_anticlockwise(center.x, center.y, radius, start, end, anticlockwise);
					pen = Some(center + radius * Point::from_angle(end));
				}
			}
		}
		self.ctx.set_line_cap("round");
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.stroke();
	}

	fn fill_polygon(&mut self, points: &[Point], color: &str) {
		let Some((first, rest)) = points.split_first() else {
			return;
		};
		self.ctx.begin_path();
		self.ctx.move_to(first.x, first.y);
		for p in rest {
			self.ctx.line_to(p.x, p.y);
		}
		self.ctx.close_path();
		self.ctx.set_fill_style_str(color);
		self.ctx.fill();
	}

	fn fill_text(&mut self, text: &str, at: Point, rotation: f64, font_size: f64, color: &str) {
		self.ctx.save();
		let _ = self.ctx.translate(at.x, at.y);
		let _ = self.ctx.rotate(rotation);
		self.ctx.set_font(&font(font_size));
		self.ctx.set_text_align("center");
		self.ctx.set_fill_style_str(color);
		let _ = self.ctx.fill_text(text, 0.0, 0.0);
		self.ctx.restore();
	}
}

/// Text widths from the canvas' own font metrics.
pub struct CanvasMeasure {
	ctx: CanvasRenderingContext2d,
}

impl CanvasMeasure {
	pub fn new(ctx: CanvasRenderingContext2d) -> Self {
		Self { ctx }
	}
}

impl TextMeasure for CanvasMeasure {
	fn measure(&self, text: &str, font_size: f64) -> f64 {
		self.ctx.set_font(&font(font_size));
		self.ctx
			.measure_text(text)
			.map(|m| m.width())
			.unwrap_or_else(|_| text.chars().count() as f64 * font_size * 0.6)
	}
}
