//! JSON content description.
//!
//! A description registers named styles and appends blocks to a
//! [`DocumentAssembler`]. Lengths are points when given as numbers, or strings
//! with a `pt`, `mm`, `cm` or `in` suffix. Table rules are written the way
//! ReportLab table styles are: `[COMMAND, [col, row], [col, row], args...]`.
//!
//! ```json
//! {
//!   "metadata": { "title": "Guia" },
//!   "styles": [{ "name": "Body", "font_family": "SimHei", "font_size": 11 }],
//!   "blocks": [
//!     { "type": "paragraph", "style": "Body", "text": "<b>Hola</b>" },
//!     { "type": "spacer", "height": "1cm" },
//!     { "type": "page_break" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::builder::DocumentAssembler;
use crate::config::{Metadata, RenderConfig};
use crate::error::ConfigurationError;
use crate::model::TableCell;
use crate::style::{Color, HorizontalAlignment, ParagraphStyle, StyleRef};
use crate::table::{CellRegion, LineSpec, TableAttribute, TableRule, VerticalAlignment};

/// The monetization guide, embedded at build time.
pub const GUIDE_CONTENT: &str = include_str!("../content/monetization_guide.json");

/// A length in points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawLength")]
pub struct Length(pub f64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLength {
    Points(f64),
    Text(String),
}

impl TryFrom<RawLength> for Length {
    type Error = String;

    fn try_from(raw: RawLength) -> Result<Self, Self::Error> {
        match raw {
            RawLength::Points(points) => Ok(Length(points)),
            RawLength::Text(text) => parse_length(&text)
                .map(Length)
                .ok_or_else(|| format!("invalid length `{text}`")),
        }
    }
}

fn parse_length(text: &str) -> Option<f64> {
    const UNITS: &[(&str, f64)] = &[
        ("pt", 1.0),
        ("mm", 72.0 / 25.4),
        ("cm", 72.0 / 2.54),
        ("in", 72.0),
    ];
    let text = text.trim();
    let (number, factor) = UNITS
        .iter()
        .find_map(|(suffix, factor)| text.strip_suffix(suffix).map(|n| (n, *factor)))
        .unwrap_or((text, 1.0));
    number.trim().parse::<f64>().ok().map(|value| value * factor)
}

/// Top-level content description.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentDescription {
    /// Document metadata; replaces the configured metadata when present.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Styles, registered in order.
    #[serde(default)]
    pub styles: Vec<StyleDescription>,
    /// Blocks, appended in order.
    #[serde(default)]
    pub blocks: Vec<BlockDescription>,
}

/// A named paragraph style.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleDescription {
    /// Unique style name.
    pub name: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in points.
    pub font_size: u8,
    /// Line pitch; 1.2 × size when omitted.
    #[serde(default)]
    pub leading: Option<Length>,
    /// Line alignment.
    #[serde(default)]
    pub alignment: HorizontalAlignment,
    /// Text colour.
    #[serde(default)]
    pub text_color: Option<String>,
    /// Background colour.
    #[serde(default)]
    pub background: Option<String>,
    /// Left indent.
    #[serde(default)]
    pub left_indent: Length,
    /// Right indent.
    #[serde(default)]
    pub right_indent: Length,
    /// Space above.
    #[serde(default)]
    pub space_before: Length,
    /// Space below.
    #[serde(default)]
    pub space_after: Length,
    /// Whether paragraphs in this style appear in the outline.
    #[serde(default)]
    pub outline: bool,
}

impl StyleDescription {
    fn to_style(&self) -> Result<ParagraphStyle, ConfigurationError> {
        let mut style = ParagraphStyle::new(self.font_family.clone(), self.font_size)
            .with_alignment(self.alignment)
            .with_indents(self.left_indent.0, self.right_indent.0)
            .with_spacing(self.space_before.0, self.space_after.0)
            .with_outline(self.outline);
        if let Some(leading) = self.leading {
            style = style.with_leading(leading.0);
        }
        if let Some(color) = &self.text_color {
            style = style.with_text_color(Color::parse(color)?);
        }
        if let Some(color) = &self.background {
            style = style.with_background(Color::parse(color)?);
        }
        Ok(style)
    }
}

/// One table cell: plain text or text with its own style.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CellDescription {
    /// Text formatted by the table defaults.
    Text(String),
    /// Text with an explicit style.
    Styled {
        /// Cell markup.
        text: String,
        /// Style name.
        #[serde(default)]
        style: Option<String>,
    },
}

/// A content block.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDescription {
    /// A paragraph.
    Paragraph {
        /// Style name.
        style: String,
        /// Markup.
        text: String,
    },
    /// Vertical space.
    Spacer {
        /// Height.
        height: Length,
    },
    /// Forced page break.
    PageBreak,
    /// A table.
    Table {
        /// Column widths.
        column_widths: Vec<Length>,
        /// Rows of cells.
        rows: Vec<Vec<CellDescription>>,
        /// ReportLab-style rules.
        #[serde(default)]
        rules: Vec<Vec<Value>>,
        /// Style for unstyled cells of the first row.
        #[serde(default)]
        header_style: Option<String>,
        /// Style for unstyled cells of the remaining rows.
        #[serde(default)]
        cell_style: Option<String>,
    },
    /// Paragraphs sharing a style, each followed by a spacer.
    List {
        /// Style name.
        style: String,
        /// Item markup.
        items: Vec<String>,
        /// Text put in front of every item.
        #[serde(default)]
        prefix: String,
        /// Spacer after each item.
        #[serde(default)]
        spacing: Length,
    },
}

/// Parses `json` and applies it to `assembler`.
pub fn load_content(json: &str, assembler: &mut DocumentAssembler) -> Result<(), ConfigurationError> {
    let description: ContentDescription = serde_json::from_str(json)?;
    description.apply(assembler)
}

/// An assembler populated with the embedded monetization guide.
pub fn guide_assembler(config: RenderConfig) -> Result<DocumentAssembler, ConfigurationError> {
    let mut assembler = DocumentAssembler::new(config);
    load_content(GUIDE_CONTENT, &mut assembler)?;
    Ok(assembler)
}

impl ContentDescription {
    /// Registers the styles and appends the blocks.
    pub fn apply(self, assembler: &mut DocumentAssembler) -> Result<(), ConfigurationError> {
        if let Some(metadata) = self.metadata {
            assembler.set_metadata(metadata);
        }
        for style in &self.styles {
            assembler.register_style(style.name.clone(), style.to_style()?)?;
        }
        for (index, block) in self.blocks.into_iter().enumerate() {
            append_block(assembler, index, block)?;
        }
        Ok(())
    }
}

fn lookup(assembler: &DocumentAssembler, name: &str) -> Result<StyleRef, ConfigurationError> {
    assembler.styles().require(name).cloned()
}

fn append_block(
    assembler: &mut DocumentAssembler,
    index: usize,
    block: BlockDescription,
) -> Result<(), ConfigurationError> {
    match block {
        BlockDescription::Paragraph { style, text } => {
            let style = lookup(assembler, &style)?;
            assembler.append_paragraph(text, &style);
        }
        BlockDescription::Spacer { height } => {
            assembler.append_spacer(height.0);
        }
        BlockDescription::PageBreak => {
            assembler.append_page_break();
        }
        BlockDescription::Table {
            column_widths,
            rows,
            rules,
            header_style,
            cell_style,
        } => {
            let header_style = header_style.map(|name| lookup(assembler, &name)).transpose()?;
            let cell_style = cell_style.map(|name| lookup(assembler, &name)).transpose()?;

            let mut cells = Vec::with_capacity(rows.len());
            for (row_index, row) in rows.into_iter().enumerate() {
                let default = if row_index == 0 { &header_style } else { &cell_style };
                let row = row
                    .into_iter()
                    .map(|cell| {
                        let (text, style) = match cell {
                            CellDescription::Text(text) => (text, None),
                            CellDescription::Styled { text, style } => (text, style),
                        };
                        match style {
                            Some(name) => Ok(TableCell::styled(text, &lookup(assembler, &name)?)),
                            None => Ok(match default {
                                Some(style) => TableCell::styled(text, style),
                                None => TableCell::new(text),
                            }),
                        }
                    })
                    .collect::<Result<Vec<_>, ConfigurationError>>()?;
                cells.push(row);
            }

            let mut parsed = Vec::new();
            for (rule_index, rule) in rules.iter().enumerate() {
                parsed.extend(parse_rule(rule).map_err(|message| {
                    ConfigurationError::InvalidTableRule {
                        block: index,
                        rule: rule_index,
                        message,
                    }
                })?);
            }

            let widths = column_widths.into_iter().map(|width| width.0).collect();
            assembler.append_table(cells, widths, parsed);
        }
        BlockDescription::List {
            style,
            items,
            prefix,
            spacing,
        } => {
            let style = lookup(assembler, &style)?;
            for item in items {
                assembler
                    .append_paragraph(format!("{prefix}{item}"), &style)
                    .append_spacer(spacing.0);
            }
        }
    }
    Ok(())
}

fn parse_rule(values: &[Value]) -> Result<Vec<TableRule>, String> {
    let [command, start, end, args @ ..] = values else {
        return Err("expected [COMMAND, [col, row], [col, row], ...]".to_owned());
    };
    let command = command
        .as_str()
        .ok_or_else(|| "command must be a string".to_owned())?
        .to_ascii_uppercase();
    let region = CellRegion::new(corner(start)?, corner(end)?);
    let rule = |attribute| TableRule::new(region, attribute);

    let attributes = match command.as_str() {
        "BACKGROUND" => vec![TableAttribute::Background(color(arg(args, 0)?)?)],
        "ROWBACKGROUNDS" => {
            let colors = arg(args, 0)?
                .as_array()
                .ok_or_else(|| "ROWBACKGROUNDS expects a list of colours".to_owned())?
                .iter()
                .map(color)
                .collect::<Result<Vec<_>, _>>()?;
            vec![TableAttribute::RowBackgrounds(colors)]
        }
        "TEXTCOLOR" => vec![TableAttribute::TextColor(color(arg(args, 0)?)?)],
        "ALIGN" | "ALIGNMENT" => {
            let alignment = match keyword(arg(args, 0)?)?.as_str() {
                "LEFT" => HorizontalAlignment::Left,
                "CENTER" | "CENTRE" => HorizontalAlignment::Center,
                "RIGHT" => HorizontalAlignment::Right,
                other => return Err(format!("unknown alignment `{other}`")),
            };
            vec![TableAttribute::Align(alignment)]
        }
        "VALIGN" => {
            let alignment = match keyword(arg(args, 0)?)?.as_str() {
                "TOP" => VerticalAlignment::Top,
                "MIDDLE" => VerticalAlignment::Middle,
                "BOTTOM" => VerticalAlignment::Bottom,
                other => return Err(format!("unknown vertical alignment `{other}`")),
            };
            vec![TableAttribute::VAlign(alignment)]
        }
        "FONTNAME" | "FACE" => vec![TableAttribute::FontName(string(arg(args, 0)?)?)],
        "FONTSIZE" | "SIZE" => vec![TableAttribute::FontSize(font_size(arg(args, 0)?)?)],
        "LEADING" => vec![TableAttribute::Leading(number(arg(args, 0)?)?)],
        "FONT" => {
            let mut attributes = vec![TableAttribute::FontName(string(arg(args, 0)?)?)];
            if let Some(size) = args.get(1) {
                attributes.push(TableAttribute::FontSize(font_size(size)?));
            }
            if let Some(leading) = args.get(2) {
                attributes.push(TableAttribute::Leading(number(leading)?));
            }
            attributes
        }
        "GRID" => vec![TableAttribute::Grid(line(args)?)],
        "BOX" | "OUTLINE" => vec![TableAttribute::Box(line(args)?)],
        "INNERGRID" => vec![TableAttribute::InnerGrid(line(args)?)],
        "TOPPADDING" => vec![TableAttribute::TopPadding(number(arg(args, 0)?)?)],
        "BOTTOMPADDING" => vec![TableAttribute::BottomPadding(number(arg(args, 0)?)?)],
        "LEFTPADDING" => vec![TableAttribute::LeftPadding(number(arg(args, 0)?)?)],
        "RIGHTPADDING" => vec![TableAttribute::RightPadding(number(arg(args, 0)?)?)],
        other => return Err(format!("unsupported command `{other}`")),
    };
    Ok(attributes.into_iter().map(rule).collect())
}

fn arg(args: &[Value], index: usize) -> Result<&Value, String> {
    args.get(index)
        .ok_or_else(|| format!("missing argument {}", index + 1))
}

fn corner(value: &Value) -> Result<(i32, i32), String> {
    let invalid = || format!("invalid cell coordinate {value}");
    let [column, row] = value.as_array().map(Vec::as_slice).ok_or_else(invalid)? else {
        return Err(invalid());
    };
    let index = |v: &Value| {
        v.as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(invalid)
    };
    Ok((index(column)?, index(row)?))
}

fn color(value: &Value) -> Result<Color, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected a colour, found {value}"))?;
    Color::parse(text).map_err(|err| err.to_string())
}

fn string(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| format!("expected a string, found {value}"))
}

fn keyword(value: &Value) -> Result<String, String> {
    string(value).map(|s| s.to_ascii_uppercase())
}

fn number(value: &Value) -> Result<f64, String> {
    let parsed = match value {
        Value::String(text) => parse_length(text),
        other => other.as_f64(),
    };
    parsed.ok_or_else(|| format!("expected a number, found {value}"))
}

fn font_size(value: &Value) -> Result<u8, String> {
    value
        .as_u64()
        .and_then(|size| u8::try_from(size).ok())
        .filter(|size| *size > 0)
        .ok_or_else(|| format!("invalid font size {value}"))
}

fn line(args: &[Value]) -> Result<LineSpec, String> {
    let width = number(arg(args, 0)?)?;
    let color = match args.get(1) {
        Some(value) => color(value)?,
        None => Color::BLACK,
    };
    Ok(LineSpec::new(width, color))
}
