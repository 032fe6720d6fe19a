//! Data structures describing the logical content of the document.
//!
//! Blocks are plain values: they reference styles through [`StyleRef`] handles
//! and keep table formatting as an ordered list of [`TableRule`]s. Nothing here
//! touches the rendering backend, and nothing is validated until render.

use crate::style::StyleRef;
use crate::table::TableRule;

/// Styled paragraph text, possibly containing inline markup.
#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    text: String,
    style: StyleRef,
}

impl Paragraph {
    /// Creates a paragraph with the given markup and style.
    pub fn new(text: impl Into<String>, style: &StyleRef) -> Self {
        Self {
            text: text.into(),
            style: style.clone(),
        }
    }

    /// Returns the raw markup.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the paragraph style.
    pub fn style(&self) -> &StyleRef {
        &self.style
    }
}

/// A single table cell.
///
/// Cells without a style take their font, size, colour and alignment from the
/// table rules; a cell style overrides those for its own content.
#[derive(Clone, Debug, PartialEq)]
pub struct TableCell {
    text: String,
    style: Option<StyleRef>,
}

impl TableCell {
    /// Creates a cell formatted by the table rules.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    /// Creates a cell formatted by its own paragraph style.
    pub fn styled(text: impl Into<String>, style: &StyleRef) -> Self {
        Self {
            text: text.into(),
            style: Some(style.clone()),
        }
    }

    /// Returns the raw markup.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the cell style, if any.
    pub fn style(&self) -> Option<&StyleRef> {
        self.style.as_ref()
    }
}

impl From<&str> for TableCell {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TableCell {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A grid of cells with fixed column widths (points).
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    rows: Vec<Vec<TableCell>>,
    column_widths: Vec<f64>,
    rules: Vec<TableRule>,
}

impl Table {
    /// Creates a table from rows, column widths and ordered style rules.
    pub fn new(rows: Vec<Vec<TableCell>>, column_widths: Vec<f64>, rules: Vec<TableRule>) -> Self {
        Self {
            rows,
            column_widths,
            rules,
        }
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Vec<TableCell>] {
        &self.rows
    }

    /// Returns the column widths in points.
    pub fn column_widths(&self) -> &[f64] {
        &self.column_widths
    }

    /// Returns the style rules in application order.
    pub fn rules(&self) -> &[TableRule] {
        &self.rules
    }

    /// Total width of the table.
    pub fn width(&self) -> f64 {
        self.column_widths.iter().sum()
    }
}

/// Individual content blocks, in reading order.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled paragraph content.
    Paragraph(Paragraph),
    /// Fixed vertical whitespace, in points.
    Spacer(f64),
    /// Table content.
    Table(Table),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Short description used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Paragraph(_) => "paragraph",
            Self::Spacer(_) => "spacer",
            Self::Table(_) => "table",
            Self::PageBreak => "page break",
        }
    }
}
