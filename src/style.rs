//! Paragraph styles and the style sheet that names them.
//!
//! Styles are immutable once registered. Blocks hold a cheap [`StyleRef`] so a
//! single definition can be shared by every paragraph that uses it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigurationError;

/// RGB colour used for text, backgrounds and table lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Pure white.
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    /// Pure black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// ReportLab's `colors.grey` (50% grey).
    pub const GREY: Color = Color::rgb(0x80, 0x80, 0x80);

    /// Creates a colour from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the `#` is optional) or one of the names `white`,
    /// `black`, `grey` and `gray`.
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            "grey" | "gray" => return Ok(Self::GREY),
            _ => {}
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigurationError::InvalidColor(value.to_owned()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| ConfigurationError::InvalidColor(value.to_owned()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub(crate) fn to_genpdf(self) -> genpdf::style::Color {
        genpdf::style::Color::Rgb(self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Horizontal alignment of paragraph lines and table cell content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

impl HorizontalAlignment {
    /// Offset of a line of `line_width` inside a box of `available` points.
    pub fn offset(self, available: f64, line_width: f64) -> f64 {
        let slack = (available - line_width).max(0.0);
        match self {
            Self::Left => 0.0,
            Self::Center => slack / 2.0,
            Self::Right => slack,
        }
    }
}

/// Rendering attributes of a paragraph. All lengths are in points.
#[derive(Clone, Debug, PartialEq)]
pub struct ParagraphStyle {
    /// Font family name, resolved against the font configuration at render time.
    pub font_family: String,
    /// Font size in points.
    pub font_size: u8,
    /// Baseline-to-baseline distance.
    pub leading: f64,
    /// Line alignment.
    pub alignment: HorizontalAlignment,
    /// Text colour.
    pub text_color: Color,
    /// Background painted behind the paragraph box.
    pub background: Option<Color>,
    /// Indentation from the left frame edge.
    pub left_indent: f64,
    /// Indentation from the right frame edge.
    pub right_indent: f64,
    /// Vertical space requested above the paragraph.
    pub space_before: f64,
    /// Vertical space requested below the paragraph.
    pub space_after: f64,
    /// Whether paragraphs in this style become outline entries.
    pub outline: bool,
}

impl ParagraphStyle {
    /// Creates a left-aligned black style with leading of 1.2 × size.
    ///
    /// ReportLab's `ParagraphStyle` keeps a fixed 12pt leading instead; set
    /// it with [`ParagraphStyle::with_leading`] where that matters.
    pub fn new(font_family: impl Into<String>, font_size: u8) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
            leading: f64::from(font_size) * 1.2,
            alignment: HorizontalAlignment::Left,
            text_color: Color::BLACK,
            background: None,
            left_indent: 0.0,
            right_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            outline: false,
        }
    }

    /// Sets the leading and returns the updated style.
    pub fn with_leading(mut self, leading: f64) -> Self {
        self.leading = leading;
        self
    }

    /// Sets the alignment and returns the updated style.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the text colour and returns the updated style.
    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    /// Sets the background colour and returns the updated style.
    pub fn with_background(mut self, color: impl Into<Option<Color>>) -> Self {
        self.background = color.into();
        self
    }

    /// Sets both indents and returns the updated style.
    pub fn with_indents(mut self, left: f64, right: f64) -> Self {
        self.left_indent = left;
        self.right_indent = right;
        self
    }

    /// Sets the space before and after and returns the updated style.
    pub fn with_spacing(mut self, before: f64, after: f64) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    /// Marks the style as producing outline entries.
    pub fn with_outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }
}

/// Shared handle to a registered style.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleRef {
    name: Arc<str>,
    style: Arc<ParagraphStyle>,
}

impl StyleRef {
    /// Name the style was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The style attributes.
    pub fn style(&self) -> &ParagraphStyle {
        &self.style
    }
}

/// Registry of uniquely named styles, in registration order.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    styles: Vec<StyleRef>,
    by_name: HashMap<String, usize>,
}

impl StyleSheet {
    /// Creates an empty style sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `style` under `name`. Fails if the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        style: ParagraphStyle,
    ) -> Result<StyleRef, ConfigurationError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ConfigurationError::DuplicateStyle(name));
        }
        let handle = StyleRef {
            name: Arc::from(name.as_str()),
            style: Arc::new(style),
        };
        self.by_name.insert(name, self.styles.len());
        self.styles.push(handle.clone());
        Ok(handle)
    }

    /// Looks up a style by name.
    pub fn get(&self, name: &str) -> Option<&StyleRef> {
        self.by_name.get(name).map(|&index| &self.styles[index])
    }

    /// Looks up a style by name, reporting unknown names as configuration errors.
    pub fn require(&self, name: &str) -> Result<&StyleRef, ConfigurationError> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::UnknownStyle(name.to_owned()))
    }

    /// Iterates over the styles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StyleRef> {
        self.styles.iter()
    }

    /// Number of registered styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether no style has been registered.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut sheet = StyleSheet::new();
        sheet
            .register("Body", ParagraphStyle::new("SimHei", 11))
            .expect("first registration succeeds");
        let err = sheet
            .register("Body", ParagraphStyle::new("SimHei", 12))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateStyle(name) if name == "Body"));
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.get("Body").map(|s| s.style().font_size), Some(11));
    }

    #[test]
    fn registered_style_is_retrievable() {
        let mut sheet = StyleSheet::new();
        let handle = sheet
            .register(
                "Heading",
                ParagraphStyle::new("SimHei", 18)
                    .with_leading(24.0)
                    .with_outline(true),
            )
            .expect("register");
        let found = sheet.require("Heading").expect("lookup");
        assert_eq!(found, &handle);
        assert!(found.style().outline);
        assert!(sheet.require("Missing").is_err());
    }

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!(Color::parse("#6366f1").unwrap(), Color::rgb(0x63, 0x66, 0xf1));
        assert_eq!(Color::parse("F5F5F5").unwrap(), Color::rgb(0xf5, 0xf5, 0xf5));
        assert_eq!(Color::parse("grey").unwrap(), Color::GREY);
        assert_eq!(Color::parse("White").unwrap(), Color::WHITE);
        assert!(Color::parse("#12FG34").is_err());
        assert!(Color::parse("#123").is_err());
        assert_eq!(Color::rgb(0x8b, 0x5c, 0xf6).to_string(), "#8b5cf6");
    }

    #[test]
    fn default_leading_scales_with_size() {
        assert_eq!(ParagraphStyle::new("SimHei", 10).leading, 12.0);
        assert_eq!(ParagraphStyle::new("SimHei", 20).leading, 24.0);
        assert_eq!(ParagraphStyle::new("SimHei", 20).with_leading(12.0).leading, 12.0);
    }

    #[test]
    fn alignment_offsets() {
        assert_eq!(HorizontalAlignment::Left.offset(100.0, 40.0), 0.0);
        assert_eq!(HorizontalAlignment::Center.offset(100.0, 40.0), 30.0);
        assert_eq!(HorizontalAlignment::Right.offset(100.0, 40.0), 60.0);
        assert_eq!(HorizontalAlignment::Right.offset(30.0, 40.0), 0.0);
    }
}
