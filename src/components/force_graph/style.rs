//! CSS-like style model for nodes and relationships.
//!
//! Rules pair a selector (`node`/`relationship` plus label or type classes)
//! with a property bag. Resolution scans every rule in insertion order and
//! merges the properties of each matching rule, later rules winning. The
//! first time a label is styled without an explicit color or caption, a
//! default rule for it is synthesized once and kept.
//!
//! Style sheets travel as JSON objects (`selector -> {property: value}`) or as
//! "grass" text:
//!
//! ```text
//! node.Person {
//!   color: #C990C0;
//!   caption: '{name}';
//! }
//! ```

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use log::{debug, warn};
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_till, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, opt};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated};
use nom::{Finish, IResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::StyleError;
use super::model::{Node, Relationship};
use super::theme::Color;
use super::types::{Properties, property_text};

/// Property bag of a single rule, in the order properties were written.
pub type StyleProps = IndexMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectorTag {
	Node,
	Relationship,
}

impl SelectorTag {
	fn as_str(self) -> &'static str {
		match self {
			SelectorTag::Node => "node",
			SelectorTag::Relationship => "relationship",
		}
	}
}

/// A tag plus zero or more classes (labels, or a relationship type).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
	pub tag: SelectorTag,
	pub classes: Vec<String>,
}

impl Selector {
	pub fn new(tag: SelectorTag, classes: Vec<String>) -> Self {
		Self { tag, classes }
	}

	/// Parse `node.Label\.With\.Dots.Other` style selector strings.
	pub fn parse(text: &str) -> Result<Self, StyleError> {
		let mut parts = Vec::new();
		let mut current = String::new();
		let mut chars = text.trim().chars().peekable();
		while let Some(c) = chars.next() {
			match c {
				'\\' if chars.peek() == Some(&'.') => {
					current.push('.');
					chars.next();
				}
				'.' => parts.push(std::mem::take(&mut current)),
				c => current.push(c),
			}
		}
		parts.push(current);
		let mut parts = parts.into_iter();
		let tag = match parts.next().as_deref() {
			Some("node") => SelectorTag::Node,
			Some("relationship") => SelectorTag::Relationship,
			Some("") | None => return Err(StyleError::EmptySelector),
			Some(other) => return Err(StyleError::UnknownTag(other.to_string())),
		};
		Ok(Self::new(tag, parts.filter(|p| !p.is_empty()).collect()))
	}

	/// Every class of `self` is present in `target` and the tags agree.
	pub fn matches(&self, target: &Selector) -> bool {
		self.tag == target.tag && self.classes.iter().all(|c| target.classes.contains(c))
	}

	pub fn matches_exact(&self, target: &Selector) -> bool {
		self.matches(target) && self.classes.len() == target.classes.len()
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag.as_str())?;
		for class in &self.classes {
			write!(f, ".{}", class.replace('.', "\\."))?;
		}
		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleRule {
	pub selector: Selector,
	pub props: StyleProps,
}

/// Ordered `selector -> properties` mapping, serialized as a JSON object in
/// rule order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSheet {
	pub rules: IndexMap<String, StyleProps>,
}

/// Default fill/border/text triple handed out to unstyled labels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefaultColor {
	pub color: &'static str,
	pub border_color: &'static str,
	pub text_color_internal: &'static str,
}

pub const DEFAULT_COLORS: &[DefaultColor] = &[
	DefaultColor { color: "#604A0E", border_color: "#423204", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#C990C0", border_color: "#B261A5", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#F79767", border_color: "#F36924", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#57C7E3", border_color: "#23B3D7", text_color_internal: "#2A2C34" },
	DefaultColor { color: "#F16667", border_color: "#EB2728", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#D9C8AE", border_color: "#C0A378", text_color_internal: "#2A2C34" },
	DefaultColor { color: "#8DCC93", border_color: "#5DB665", text_color_internal: "#2A2C34" },
	DefaultColor { color: "#ECB5C9", border_color: "#DA7298", text_color_internal: "#2A2C34" },
	DefaultColor { color: "#4C8EDA", border_color: "#2870C2", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#FFC454", border_color: "#D7A013", text_color_internal: "#2A2C34" },
	DefaultColor { color: "#DA7194", border_color: "#CC3C6C", text_color_internal: "#FFFFFF" },
	DefaultColor { color: "#569480", border_color: "#447666", text_color_internal: "#FFFFFF" },
];

/// Diameters offered by style editors.
pub const DEFAULT_SIZES: &[&str] = &["10px", "20px", "50px", "65px", "80px"];

/// Shaft widths offered by style editors.
pub const DEFAULT_SHAFT_WIDTHS: &[&str] = &["1px", "2px", "3px", "5px", "8px", "13px", "25px", "38px"];

fn default_sheet() -> StyleSheet {
	let props = |pairs: &[(&str, &str)]| -> StyleProps {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	};
	StyleSheet {
		rules: IndexMap::from([
			(
				"node".to_string(),
				props(&[
					("diameter", "50px"),
					("color", "#A5ABB6"),
					("border-color", "#9AA1AC"),
					("border-width", "2px"),
					("text-color-internal", "#FFFFFF"),
					("font-size", "10px"),
				]),
			),
			(
				"relationship".to_string(),
				props(&[
					("color", "#A5ABB6"),
					("shaft-width", "1px"),
					("font-size", "8px"),
					("padding", "3px"),
					("text-color-external", "#000000"),
					("text-color-internal", "#FFFFFF"),
					("caption", "<type>"),
				]),
			),
		]),
	}
}

fn caption_priority() -> &'static [Regex] {
	static PRIORITY: OnceLock<Vec<Regex>> = OnceLock::new();
	PRIORITY.get_or_init(|| {
		["(?i)^name$", "(?i)^title$", "(?i)^label$", "(?i)name$", "(?i)description$", "^.+"]
			.iter()
			.filter_map(|p| Regex::new(p).ok())
			.collect()
	})
}

fn template_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("valid template regex"))
}

/// Read-only snapshot of the merged properties for one item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedStyle {
	props: StyleProps,
}

impl ResolvedStyle {
	/// Property value, or the empty string when unset.
	pub fn get(&self, name: &str) -> &str {
		self.props.get(name).map(String::as_str).unwrap_or("")
	}

	/// Leading number of a property (`"50px"` gives `50.0`).
	pub fn number(&self, name: &str) -> Option<f64> {
		parse_leading_number(self.get(name))
	}

	pub fn color(&self, name: &str) -> Option<Color> {
		Color::parse(self.get(name))
	}
}

fn parse_leading_number(text: &str) -> Option<f64> {
	let text = text.trim();
	let end = text
		.char_indices()
		.find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
		.map(|(i, _)| i)
		.unwrap_or(text.len());
	text[..end].parse().ok()
}

/// What a caption template is interpolated against.
#[derive(Clone, Copy, Debug)]
pub enum CaptionSubject<'a> {
	Node { id: &'a str, properties: &'a Properties },
	Relationship { id: &'a str, rel_type: &'a str, properties: &'a Properties },
}

impl<'a> CaptionSubject<'a> {
	pub fn of_node(node: &'a Node) -> Self {
		CaptionSubject::Node {
			id: &node.id,
			properties: &node.properties,
		}
	}

	pub fn of_relationship(rel: &'a Relationship) -> Self {
		CaptionSubject::Relationship {
			id: &rel.id,
			rel_type: &rel.rel_type,
			properties: &rel.properties,
		}
	}

	fn properties(&self) -> &'a Properties {
		match self {
			CaptionSubject::Node { properties, .. } => properties,
			CaptionSubject::Relationship { properties, .. } => properties,
		}
	}
}

/// Expand `{property}` references and the bare `<id>`/`<type>` templates.
pub fn interpolate(template: &str, subject: CaptionSubject<'_>) -> String {
	let properties = subject.properties();
	let expanded = template_pattern()
		.replace_all(template, |caps: &regex::Captures<'_>| {
			properties.get(&caps[1]).map(property_text).unwrap_or_default()
		})
		.into_owned();
	let expanded = match (expanded.is_empty(), template, subject) {
		(true, "{type}", CaptionSubject::Relationship { .. }) => "<type>".to_string(),
		(true, "{id}", CaptionSubject::Node { .. }) => "<id>".to_string(),
		_ => expanded,
	};
	match (expanded.as_str(), subject) {
		("<id>", CaptionSubject::Node { id, .. }) => id.to_string(),
		("<id>", CaptionSubject::Relationship { id, .. }) => id.to_string(),
		("<type>", CaptionSubject::Relationship { rel_type, .. }) => rel_type.to_string(),
		("<type>", CaptionSubject::Node { .. }) => String::new(),
		_ => expanded,
	}
}

/// Caption template for a node without an explicit caption rule.
pub fn default_node_caption(properties: &Properties) -> String {
	for pattern in caption_priority() {
		if let Some(key) = properties.keys().find(|k| pattern.is_match(k)) {
			return format!("{{{key}}}");
		}
	}
	"<id>".to_string()
}

/// Deterministic color for labels beyond the built-in palette.
pub fn color_for_label(label: &str) -> StyleProps {
	let hash = label.bytes().fold(0x811c9dc5u32, |h, b| {
		(h ^ b as u32).wrapping_mul(0x01000193)
	});
	let hue = (hash % 360) as f64;
	let fill = Color::from_hsl(hue, 0.55, 0.62);
	let border = Color::from_hsl(hue, 0.55, 0.45);
	let text = if fill.luminance() > 0.6 { "#2A2C34" } else { "#FFFFFF" };
	StyleProps::from([
		("color".to_string(), fill.to_css()),
		("border-color".to_string(), border.to_css()),
		("text-color-internal".to_string(), text.to_string()),
	])
}

/// The rule list and the operations on it. Owns its rules exclusively;
/// callers only ever see [`ResolvedStyle`] snapshots.
#[derive(Clone, Debug)]
pub struct GraphStyle {
	rules: Vec<StyleRule>,
	revision: u64,
}

impl Default for GraphStyle {
	fn default() -> Self {
		let mut style = Self {
			rules: Vec::new(),
			revision: 0,
		};
		style.load_rules(&default_sheet());
		style
	}
}

impl GraphStyle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn rules(&self) -> &[StyleRule] {
		&self.rules
	}

	/// Bumped on every change to the rule list.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	fn touch(&mut self) {
		self.revision += 1;
	}

	/// Replace all rules with those of `sheet`. Entries with unparsable
	/// selectors are skipped; an empty sheet falls back to the defaults.
	pub fn load_rules(&mut self, sheet: &StyleSheet) {
		let sheet = if sheet.rules.is_empty() {
			default_sheet()
		} else {
			sheet.clone()
		};
		self.rules.clear();
		for (text, props) in &sheet.rules {
			match Selector::parse(text) {
				Ok(selector) => self.rules.push(StyleRule {
					selector,
					props: props.clone(),
				}),
				Err(e) => warn!("prop-graph: skipping style rule `{}`: {}", text, e),
			}
		}
		self.touch();
	}

	pub fn reset_to_default(&mut self) {
		self.load_rules(&default_sheet());
	}

	pub fn to_sheet(&self) -> StyleSheet {
		StyleSheet {
			rules: self
				.rules
				.iter()
				.map(|r| (r.selector.to_string(), r.props.clone()))
				.collect(),
		}
	}

	/// Replace the rules with parsed grass text. Ill-formed text leaves the
	/// current rules untouched and returns false.
	pub fn import_grass(&mut self, text: &str) -> bool {
		match parse_grass(text) {
			Ok(sheet) => {
				self.load_rules(&sheet);
				true
			}
			Err(e) => {
				warn!("prop-graph: ignoring style sheet: {}", e);
				false
			}
		}
	}

	pub fn to_grass(&self) -> String {
		let mut out = String::new();
		for rule in &self.rules {
			out.push_str(&format!("{} {{\n", rule.selector));
			for (key, value) in &rule.props {
				if key == "caption" {
					out.push_str(&format!("  {key}: '{value}';\n"));
				} else {
					out.push_str(&format!("  {key}: {value};\n"));
				}
			}
			out.push_str("}\n\n");
		}
		out
	}

	fn find_rule_mut(&mut self, selector: &Selector) -> Option<&mut StyleRule> {
		self.rules.iter_mut().find(|r| r.selector.matches_exact(selector))
	}

	/// Merge `props` into the rule with exactly this selector, creating it
	/// at the end of the list if needed.
	pub fn change_for_selector(&mut self, selector: &Selector, props: StyleProps) {
		match self.find_rule_mut(selector) {
			Some(rule) => rule.props.extend(props),
			None => self.rules.push(StyleRule {
				selector: selector.clone(),
				props,
			}),
		}
		self.touch();
	}

	/// Drop the rule with exactly this selector.
	pub fn destroy_rule(&mut self, selector: &Selector) {
		let before = self.rules.len();
		self.rules.retain(|r| !r.selector.matches_exact(selector));
		if self.rules.len() != before {
			self.touch();
		}
	}

	fn calculate(&self, selector: &Selector) -> ResolvedStyle {
		let mut props = StyleProps::new();
		for rule in &self.rules {
			if rule.selector.matches(selector) {
				props.extend(rule.props.iter().map(|(k, v)| (k.clone(), v.clone())));
			}
		}
		ResolvedStyle { props }
	}

	pub fn node_selector(node: &Node) -> Selector {
		Selector::new(SelectorTag::Node, node.labels.clone())
	}

	pub fn relationship_selector(rel: &Relationship) -> Selector {
		let classes = if rel.rel_type.is_empty() {
			Vec::new()
		} else {
			vec![rel.rel_type.clone()]
		};
		Selector::new(SelectorTag::Relationship, classes)
	}

	/// Resolve a node's style, synthesizing default color/caption rules for
	/// its first label if nothing more specific provides them.
	pub fn for_node(&mut self, node: &Node) -> ResolvedStyle {
		let selector = Self::node_selector(node);
		if !node.labels.is_empty() {
			self.set_default_node_styling(&selector, &node.properties);
		}
		self.calculate(&selector)
	}

	pub fn for_relationship(&self, rel: &Relationship) -> ResolvedStyle {
		self.calculate(&Self::relationship_selector(rel))
	}

	fn set_default_node_styling(&mut self, selector: &Selector, properties: &Properties) {
		let mut needs_color = true;
		let mut needs_caption = true;
		for rule in &self.rules {
			if !rule.selector.classes.is_empty() && rule.selector.matches(selector) {
				needs_color &= !rule.props.contains_key("color");
				needs_caption &= !rule.props.contains_key("caption");
			}
		}
		if !needs_color && !needs_caption {
			return;
		}
		let mut classes = selector.classes.clone();
		classes.sort();
		classes.truncate(1);
		let minimal = Selector::new(SelectorTag::Node, classes);
		if needs_color {
			let props = self.next_default_color(&minimal);
			debug!("prop-graph: default color for `{}`", minimal);
			self.change_for_selector(&minimal, props);
		}
		if needs_caption {
			let caption = default_node_caption(properties);
			self.change_for_selector(&minimal, StyleProps::from([("caption".to_string(), caption)]));
		}
	}

	/// First palette entry not already used by a label rule, else a color
	/// derived from the label name.
	fn next_default_color(&self, selector: &Selector) -> StyleProps {
		let used: Vec<String> = self
			.rules
			.iter()
			.filter(|r| !r.selector.classes.is_empty())
			.filter_map(|r| r.props.get("color"))
			.map(|c| c.to_ascii_uppercase())
			.collect();
		if let Some(free) = DEFAULT_COLORS
			.iter()
			.find(|d| !used.iter().any(|u| u == &d.color.to_ascii_uppercase()))
		{
			return StyleProps::from([
				("color".to_string(), free.color.to_string()),
				("border-color".to_string(), free.border_color.to_string()),
				("text-color-internal".to_string(), free.text_color_internal.to_string()),
			]);
		}
		color_for_label(selector.classes.first().map(String::as_str).unwrap_or(""))
	}
}

fn quoted(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('\''), take_till(|c| c == '\''), char('\'')),
		delimited(char('"'), take_till(|c| c == '"'), char('"')),
	))(input)
}

fn grass_selector(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| !c.is_whitespace() && !"{};".contains(c))(input)
}

fn property_key(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| !c.is_whitespace() && !":;{}'\"".contains(c))(input)
}

fn property_value(input: &str) -> IResult<&str, &str> {
	alt((quoted, map(is_not(";{}'\""), str::trim)))(input)
}

/// `key: value;`, the semicolon optional before `}`. Empty values and
/// stray semicolons yield nothing.
fn declaration(input: &str) -> IResult<&str, Option<(&str, &str)>> {
	let (input, _) = multispace0(input)?;
	if let (input, Some(_)) = opt(char(';'))(input)? {
		return Ok((input, None));
	}
	let (input, key) = property_key(input)?;
	let (input, _) = delimited(multispace0, char(':'), multispace0)(input)?;
	let (input, value) = opt(property_value)(input)?;
	let (input, _) = preceded(multispace0, opt(char(';')))(input)?;
	Ok((input, value.filter(|v| !v.is_empty()).map(|v| (key, v))))
}

fn grass_rule(input: &str) -> IResult<&str, (&str, StyleProps)> {
	let (input, selector) = preceded(multispace0, grass_selector)(input)?;
	let (input, _) = preceded(multispace0, char('{'))(input)?;
	let (input, declarations) = many0(declaration)(input)?;
	let (input, _) = preceded(multispace0, char('}'))(input)?;
	let props = declarations
		.into_iter()
		.flatten()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	Ok((input, (selector, props)))
}

/// Parse grass text into a style sheet. Nothing is applied on error.
pub fn parse_grass(text: &str) -> Result<StyleSheet, StyleError> {
	let syntax = |rest: &str| StyleError::Syntax {
		offset: text.len() - rest.len(),
	};
	let (rest, parsed) = terminated(many0(grass_rule), multispace0)(text)
		.finish()
		.map_err(|e| syntax(e.input))?;
	if !rest.is_empty() {
		return Err(syntax(rest));
	}
	let mut rules = IndexMap::new();
	for (selector, props) in parsed {
		Selector::parse(selector)?;
		rules.insert(selector.to_string(), props);
	}
	Ok(StyleSheet { rules })
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::force_graph::model::tests::node as node_record;
	use serde_json::json;

	fn node(labels: &[&str], props: &[(&str, serde_json::Value)]) -> Node {
		let mut record = node_record("n1", labels);
		for (k, v) in props {
			record.properties.insert(k.to_string(), v.clone());
		}
		Node::from_record(&record)
	}

	#[test]
	fn selector_round_trips_escaped_dots() {
		let selector = Selector::parse("node.Foo\\.Bar.Baz").unwrap();
		assert_eq!(selector.classes, vec!["Foo.Bar".to_string(), "Baz".to_string()]);
		assert_eq!(selector.to_string(), "node.Foo\\.Bar.Baz");
		assert_eq!(
			Selector::parse("edge.X"),
			Err(StyleError::UnknownTag("edge".into()))
		);
	}

	#[test]
	fn subset_matching_not_equality() {
		let rule = Selector::parse("node.Person").unwrap();
		let target = Selector::new(SelectorTag::Node, vec!["Admin".into(), "Person".into()]);
		assert!(rule.matches(&target));
		assert!(!rule.matches_exact(&target));
		let rel = Selector::new(SelectorTag::Relationship, vec!["Person".into()]);
		assert!(!rule.matches(&rel));
	}

	#[test]
	fn later_rules_override_earlier_ones() {
		let mut style = GraphStyle::new();
		style.change_for_selector(
			&Selector::parse("node.Person").unwrap(),
			StyleProps::from([("diameter".to_string(), "80px".to_string())]),
		);
		let resolved = style.for_node(&node(&["Person"], &[]));
		assert_eq!(resolved.number("diameter"), Some(80.0));
		assert_eq!(resolved.get("border-width"), "2px");
	}

	#[test]
	fn destroy_rule_removes_only_the_exact_selector() {
		let mut style = GraphStyle::new();
		let person = Selector::parse("node.Person").unwrap();
		style.change_for_selector(&person, StyleProps::from([("color".to_string(), "#000".to_string())]));
		let revision = style.revision();
		style.destroy_rule(&person);
		assert!(style.rules().iter().all(|r| r.selector != person));
		assert!(style.rules().iter().any(|r| r.selector.to_string() == "node"));
		assert!(style.revision() > revision);
	}

	#[test]
	fn default_color_is_stable_per_label() {
		let mut style = GraphStyle::new();
		let person = node(&["Person"], &[]);
		let movie = node(&["Movie"], &[]);
		let first = style.for_node(&person).get("color").to_string();
		let other = style.for_node(&movie).get("color").to_string();
		let again = style.for_node(&person).get("color").to_string();
		assert_eq!(first, again);
		assert_ne!(first, other);
		let person_rules = style
			.rules()
			.iter()
			.filter(|r| r.selector.classes == vec!["Person".to_string()])
			.count();
		assert_eq!(person_rules, 1);
	}

	#[test]
	fn palette_exhaustion_falls_back_to_label_hash() {
		let mut style = GraphStyle::new();
		for i in 0..DEFAULT_COLORS.len() {
			let label = format!("L{i}");
			style.for_node(&node(&[label.as_str()], &[]));
		}
		let a = style.for_node(&node(&["Overflow"], &[])).get("color").to_string();
		assert_eq!(color_for_label("Overflow")["color"], a);
	}

	#[test]
	fn caption_defaults_follow_priority() {
		let props = |keys: &[&str]| -> Properties {
			keys.iter().map(|k| (k.to_string(), json!("v"))).collect()
		};
		assert_eq!(default_node_caption(&props(&["age", "title", "Name"])), "{Name}");
		assert_eq!(default_node_caption(&props(&["age", "title"])), "{title}");
		assert_eq!(default_node_caption(&props(&["fullname", "age"])), "{fullname}");
		assert_eq!(default_node_caption(&props(&["summary_description", "age"])), "{summary_description}");
		assert_eq!(default_node_caption(&props(&["age"])), "{age}");
		assert_eq!(default_node_caption(&Properties::new()), "<id>");
	}

	#[test]
	fn interpolation_handles_templates() {
		let n = node(&["Person"], &[("name", json!("Ada")), ("tags", json!(["a", "b"]))]);
		assert_eq!(interpolate("{name} ({tags})", CaptionSubject::of_node(&n)), "Ada (a, b)");
		assert_eq!(interpolate("<id>", CaptionSubject::of_node(&n)), "n1");
		assert_eq!(interpolate("{id}", CaptionSubject::of_node(&n)), "n1");
		assert_eq!(interpolate("{missing}", CaptionSubject::of_node(&n)), "");
	}

	#[test]
	fn grass_parses_quoted_captions() {
		let sheet = parse_grass(
			"node { diameter: 40px; }\nnode.Person {\n  color: #C990C0;\n  caption: '{name}: {age}';\n}\n",
		)
		.unwrap();
		assert_eq!(sheet.rules.len(), 2);
		let (selector, person) = sheet.rules.get_index(1).unwrap();
		assert_eq!(selector, "node.Person");
		assert_eq!(person["caption"], "{name}: {age}");
		assert_eq!(person["color"], "#C990C0");
		assert_eq!(sheet.rules["node"]["diameter"], "40px");
	}

	#[test]
	fn malformed_grass_keeps_previous_rules() {
		let mut style = GraphStyle::new();
		let before = style.to_sheet();
		assert!(!style.import_grass("node { color: red;"));
		assert!(!style.import_grass("node.A { caption: 'oops }"));
		assert!(!style.import_grass("} node {}"));
		assert!(!style.import_grass("widget { color: red; }"));
		assert!(!style.import_grass("{ color: red; }"));
		assert_eq!(style.to_sheet(), before);
		assert_eq!(parse_grass("node { color: red; } }"), Err(StyleError::Syntax { offset: 21 }));
	}

	#[test]
	fn grass_tolerates_loose_declarations() {
		let sheet = parse_grass(r#"node.A{color:red}
relationship { ; caption: "<type>" ;; padding: ; }"#).unwrap();
		assert_eq!(sheet.rules["node.A"]["color"], "red");
		let rel = &sheet.rules["relationship"];
		assert_eq!(rel["caption"], "<type>");
		assert!(!rel.contains_key("padding"));
		assert_eq!(parse_grass("  
").unwrap(), StyleSheet::default());
	}

	#[test]
	fn grass_export_reimports_to_same_sheet() {
		let mut style = GraphStyle::new();
		style.for_node(&node(&["Person"], &[("name", json!("Ada"))]));
		let exported = style.to_grass();
		let mut copy = GraphStyle::new();
		assert!(copy.import_grass(&exported));
		assert_eq!(copy.to_sheet(), style.to_sheet());
	}

	#[test]
	fn sheet_json_preserves_rule_order() {
		let text = r##"{"relationship":{"color":"#000"},"node":{"color":"#fff"}}"##;
		let sheet: StyleSheet = serde_json::from_str(text).unwrap();
		assert_eq!(sheet.rules.get_index(0).map(|(k, _)| k.as_str()), Some("relationship"));
		assert_eq!(serde_json::to_string(&sheet).unwrap(), text);
	}

	#[test]
	fn leading_numbers_parse_like_css_lengths() {
		assert_eq!(parse_leading_number("50px"), Some(50.0));
		assert_eq!(parse_leading_number(" 2.5em"), Some(2.5));
		assert_eq!(parse_leading_number("px"), None);
	}

	proptest! {
		#[test]
		fn resolution_is_deterministic(
			labels in proptest::collection::vec("[A-Z][a-z]{0,6}", 0..4),
			keys in proptest::collection::vec("[a-z]{1,8}", 0..4),
		) {
			let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
			let props: Vec<(&str, serde_json::Value)> = keys.iter().map(|k| (k.as_str(), json!("v"))).collect();
			let n = node(&label_refs, &props);
			let (mut first, mut second) = (GraphStyle::new(), GraphStyle::new());
			let resolved = first.for_node(&n);
			prop_assert_eq!(&resolved, &second.for_node(&n));
			let revision = first.revision();
			prop_assert_eq!(&first.for_node(&n), &resolved);
			prop_assert_eq!(first.revision(), revision);
			prop_assert_eq!(first.to_sheet(), second.to_sheet());
		}
	}
}
