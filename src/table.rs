//! Table style rules and their resolution into per-cell formatting.
//!
//! Rules follow ReportLab's `TableStyle` model: each rule addresses a
//! rectangular region by its `(column, row)` corners, where negative indices
//! count from the end, and sets one attribute. Rules apply in order, so a later
//! rule wins wherever regions overlap.

use crate::error::LayoutError;
use crate::model::Table;
use crate::style::{Color, HorizontalAlignment};

const DEFAULT_FONT_SIZE: u8 = 10;
const DEFAULT_LEADING: f64 = 12.0;
const DEFAULT_HORIZONTAL_PADDING: f64 = 6.0;
const DEFAULT_VERTICAL_PADDING: f64 = 3.0;

/// Rectangular block of cells, given by inclusive `(column, row)` corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRegion {
    /// Top-left corner.
    pub start: (i32, i32),
    /// Bottom-right corner.
    pub end: (i32, i32),
}

impl CellRegion {
    /// Creates a region from its corners.
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        Self { start, end }
    }

    /// The whole table.
    pub fn all() -> Self {
        Self::new((0, 0), (-1, -1))
    }

    /// A single row, all columns.
    pub fn row(row: i32) -> Self {
        Self::new((0, row), (-1, row))
    }

    /// Every row from `row` to the last one.
    pub fn rows_from(row: i32) -> Self {
        Self::new((0, row), (-1, -1))
    }

    /// Resolves the region to inclusive `(columns, rows)` ranges, or `None` if
    /// it falls outside a `columns` × `rows` grid.
    pub fn resolve(
        &self,
        columns: usize,
        rows: usize,
    ) -> Option<((usize, usize), (usize, usize))> {
        let c0 = normalize(self.start.0, columns)?;
        let r0 = normalize(self.start.1, rows)?;
        let c1 = normalize(self.end.0, columns)?;
        let r1 = normalize(self.end.1, rows)?;
        (c0 <= c1 && r0 <= r1).then_some(((c0, c1), (r0, r1)))
    }
}

fn normalize(index: i32, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = i64::from(index);
    let absolute = if index < 0 { len + index } else { index };
    if (0..len).contains(&absolute) {
        usize::try_from(absolute).ok()
    } else {
        None
    }
}

/// Vertical placement of cell content within its row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    /// Content hugs the top padding.
    #[default]
    Top,
    /// Content is centred between the paddings.
    Middle,
    /// Content hugs the bottom padding.
    Bottom,
}

/// Stroke used for table lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSpec {
    /// Stroke width in points.
    pub width: f64,
    /// Stroke colour.
    pub color: Color,
}

impl LineSpec {
    /// Creates a line specification.
    pub fn new(width: f64, color: Color) -> Self {
        Self { width, color }
    }
}

/// One formatting attribute set by a rule.
#[derive(Clone, Debug, PartialEq)]
pub enum TableAttribute {
    /// Cell background.
    Background(Color),
    /// Backgrounds cycled by row parity, starting at the region's first row.
    RowBackgrounds(Vec<Color>),
    /// Text colour for unstyled cells.
    TextColor(Color),
    /// Horizontal alignment for unstyled cells.
    Align(HorizontalAlignment),
    /// Vertical alignment of cell content.
    VAlign(VerticalAlignment),
    /// Font family for unstyled cells.
    FontName(String),
    /// Font size for unstyled cells.
    FontSize(u8),
    /// Leading for unstyled cells.
    Leading(f64),
    /// Every edge of every cell in the region.
    Grid(LineSpec),
    /// The outline of the region.
    Box(LineSpec),
    /// Edges between cells inside the region.
    InnerGrid(LineSpec),
    /// Padding above cell content.
    TopPadding(f64),
    /// Padding below cell content.
    BottomPadding(f64),
    /// Padding left of cell content.
    LeftPadding(f64),
    /// Padding right of cell content.
    RightPadding(f64),
}

/// A region paired with the attribute it sets.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRule {
    /// Addressed cells.
    pub region: CellRegion,
    /// Attribute applied to them.
    pub attribute: TableAttribute,
}

impl TableRule {
    /// Creates a rule.
    pub fn new(region: CellRegion, attribute: TableAttribute) -> Self {
        Self { region, attribute }
    }
}

/// Paddings around cell content, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Padding {
    /// Top padding.
    pub top: f64,
    /// Right padding.
    pub right: f64,
    /// Bottom padding.
    pub bottom: f64,
    /// Left padding.
    pub left: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: DEFAULT_VERTICAL_PADDING,
            right: DEFAULT_HORIZONTAL_PADDING,
            bottom: DEFAULT_VERTICAL_PADDING,
            left: DEFAULT_HORIZONTAL_PADDING,
        }
    }
}

/// Effective formatting of one cell after all rules were applied.
#[derive(Clone, Debug, PartialEq)]
pub struct CellFormat {
    /// Background fill.
    pub background: Option<Color>,
    /// Text colour for unstyled content.
    pub text_color: Color,
    /// Horizontal alignment for unstyled content.
    pub align: HorizontalAlignment,
    /// Vertical alignment.
    pub valign: VerticalAlignment,
    /// Font family; `None` uses the document default.
    pub font_family: Option<String>,
    /// Font size for unstyled content.
    pub font_size: u8,
    /// Explicit leading, if a rule set one.
    pub leading: Option<f64>,
    /// Content padding.
    pub padding: Padding,
}

impl CellFormat {
    /// Leading for unstyled content.
    pub fn effective_leading(&self) -> f64 {
        self.leading.unwrap_or_else(|| {
            if self.font_size == DEFAULT_FONT_SIZE {
                DEFAULT_LEADING
            } else {
                f64::from(self.font_size) * 1.2
            }
        })
    }
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            background: None,
            text_color: Color::BLACK,
            align: HorizontalAlignment::Left,
            valign: VerticalAlignment::Top,
            font_family: None,
            font_size: DEFAULT_FONT_SIZE,
            leading: None,
            padding: Padding::default(),
        }
    }
}

/// Resolved formatting for a whole table.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTable {
    /// `cells[row][column]`.
    pub cells: Vec<Vec<CellFormat>>,
    /// Horizontal edges: `horizontal[boundary][column]`, `rows + 1` boundaries.
    pub horizontal: Vec<Vec<Option<LineSpec>>>,
    /// Vertical edges: `vertical[row][boundary]`, `columns + 1` boundaries.
    pub vertical: Vec<Vec<Option<LineSpec>>>,
}

/// Checks table dimensions and returns the resolved formatting.
///
/// `block` is the table's index in the block sequence and only feeds the
/// error messages.
pub fn resolve(block: usize, table: &Table) -> Result<ResolvedTable, LayoutError> {
    validate_dimensions(block, table)?;

    let columns = table.column_widths().len();
    let rows = table.rows().len();
    let mut resolved = ResolvedTable {
        cells: vec![vec![CellFormat::default(); columns]; rows],
        horizontal: vec![vec![None; columns]; rows + 1],
        vertical: vec![vec![None; columns + 1]; rows],
    };

    for (index, rule) in table.rules().iter().enumerate() {
        if let Some((attribute, value)) = invalid_value(&rule.attribute) {
            return Err(LayoutError::InvalidTableValue {
                block,
                rule: index,
                attribute,
                value,
            });
        }
        let ((c0, c1), (r0, r1)) = rule
            .region
            .resolve(columns, rows)
            .ok_or(LayoutError::RegionOutOfBounds { block, rule: index })?;
        resolved.apply(&rule.attribute, (c0, c1), (r0, r1));
    }

    Ok(resolved)
}

/// The attribute name and value when a rule's number is unusable.
fn invalid_value(attribute: &TableAttribute) -> Option<(&'static str, f64)> {
    let (name, value, positive) = match attribute {
        TableAttribute::FontSize(size) => ("font size", f64::from(*size), true),
        TableAttribute::Leading(leading) => ("leading", *leading, true),
        TableAttribute::TopPadding(value) => ("top padding", *value, false),
        TableAttribute::BottomPadding(value) => ("bottom padding", *value, false),
        TableAttribute::LeftPadding(value) => ("left padding", *value, false),
        TableAttribute::RightPadding(value) => ("right padding", *value, false),
        TableAttribute::Grid(line) | TableAttribute::Box(line) | TableAttribute::InnerGrid(line) => {
            ("line width", line.width, false)
        }
        _ => return None,
    };
    let valid = value.is_finite() && if positive { value > 0.0 } else { value >= 0.0 };
    (!valid).then_some((name, value))
}

fn validate_dimensions(block: usize, table: &Table) -> Result<(), LayoutError> {
    let expected = table.column_widths().len();
    if expected == 0 || table.rows().is_empty() {
        return Err(LayoutError::EmptyTable { block });
    }
    for (column, &width) in table.column_widths().iter().enumerate() {
        if !width.is_finite() || width <= 0.0 {
            return Err(LayoutError::InvalidColumnWidth {
                block,
                column,
                width,
            });
        }
    }
    for (row, cells) in table.rows().iter().enumerate() {
        if cells.len() != expected {
            return Err(LayoutError::RowWidthMismatch {
                block,
                row,
                expected,
                found: cells.len(),
            });
        }
    }
    Ok(())
}

impl ResolvedTable {
    fn apply(
        &mut self,
        attribute: &TableAttribute,
        (c0, c1): (usize, usize),
        (r0, r1): (usize, usize),
    ) {
        match attribute {
            TableAttribute::Grid(line) => {
                for boundary in r0..=r1 + 1 {
                    for column in c0..=c1 {
                        self.horizontal[boundary][column] = Some(*line);
                    }
                }
                for row in r0..=r1 {
                    for boundary in c0..=c1 + 1 {
                        self.vertical[row][boundary] = Some(*line);
                    }
                }
            }
            TableAttribute::Box(line) => {
                for column in c0..=c1 {
                    self.horizontal[r0][column] = Some(*line);
                    self.horizontal[r1 + 1][column] = Some(*line);
                }
                for row in r0..=r1 {
                    self.vertical[row][c0] = Some(*line);
                    self.vertical[row][c1 + 1] = Some(*line);
                }
            }
            TableAttribute::InnerGrid(line) => {
                for boundary in r0 + 1..=r1 {
                    for column in c0..=c1 {
                        self.horizontal[boundary][column] = Some(*line);
                    }
                }
                for row in r0..=r1 {
                    for boundary in c0 + 1..=c1 {
                        self.vertical[row][boundary] = Some(*line);
                    }
                }
            }
            TableAttribute::RowBackgrounds(colors) => {
                if colors.is_empty() {
                    return;
                }
                for row in r0..=r1 {
                    let color = colors[(row - r0) % colors.len()];
                    for cell in &mut self.cells[row][c0..=c1] {
                        cell.background = Some(color);
                    }
                }
            }
            _ => {
                for row in &mut self.cells[r0..=r1] {
                    for cell in &mut row[c0..=c1] {
                        apply_to_cell(cell, attribute);
                    }
                }
            }
        }
    }
}

fn apply_to_cell(cell: &mut CellFormat, attribute: &TableAttribute) {
    match attribute {
        TableAttribute::Background(color) => cell.background = Some(*color),
        TableAttribute::TextColor(color) => cell.text_color = *color,
        TableAttribute::Align(align) => cell.align = *align,
        TableAttribute::VAlign(valign) => cell.valign = *valign,
        TableAttribute::FontName(family) => cell.font_family = Some(family.clone()),
        TableAttribute::FontSize(size) => cell.font_size = *size,
        TableAttribute::Leading(leading) => cell.leading = Some(*leading),
        TableAttribute::TopPadding(value) => cell.padding.top = *value,
        TableAttribute::BottomPadding(value) => cell.padding.bottom = *value,
        TableAttribute::LeftPadding(value) => cell.padding.left = *value,
        TableAttribute::RightPadding(value) => cell.padding.right = *value,
        TableAttribute::Grid(_)
        | TableAttribute::Box(_)
        | TableAttribute::InnerGrid(_)
        | TableAttribute::RowBackgrounds(_) => {}
    }
}
