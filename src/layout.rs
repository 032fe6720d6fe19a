//! Measurement and pagination of the block sequence.
//!
//! [`measure`] wraps every paragraph and table cell for the frame width and
//! [`paginate`] flows the measured blocks into pages. Both stages are pure: the
//! drawing code only replays the resulting [`PagePlan`].
//! All lengths are in points, `y` grows downwards from the top of the frame.

use std::ops::Range;

use log::{debug, warn};

use crate::error::LayoutError;
use crate::model::{Block, Paragraph, Table};
use crate::richtext::{parse_markup, plain_text};
use crate::style::{Color, HorizontalAlignment, ParagraphStyle};
use crate::table::{self, ResolvedTable, VerticalAlignment};
use crate::wrap::{wrap, Line, RunFont, TextMeasure};

const FIT_EPSILON: f64 = 1e-6;
const MIN_CELL_TEXT_WIDTH: f64 = 1.0;

/// Size of the page area that blocks flow into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Usable width.
    pub width: f64,
    /// Usable height.
    pub height: f64,
}

/// A paragraph broken into lines.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredParagraph {
    /// Wrapped lines.
    pub lines: Vec<Line>,
    /// Paragraph attributes.
    pub style: ParagraphStyle,
    /// Plain title for outline-flagged paragraphs.
    pub outline_title: Option<String>,
}

/// Wrapped content of one table cell.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredCell {
    /// Wrapped lines.
    pub lines: Vec<Line>,
    /// Line pitch.
    pub leading: f64,
    /// Horizontal alignment of the lines.
    pub align: HorizontalAlignment,
    /// Text colour.
    pub text_color: Color,
}

impl MeasuredCell {
    fn content_height(&self) -> f64 {
        self.lines.len() as f64 * self.leading
    }
}

/// One table row with its height.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredRow {
    /// Cells, one per column.
    pub cells: Vec<MeasuredCell>,
    /// Row height including paddings.
    pub height: f64,
}

/// A table with wrapped cells and resolved formatting.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredTable {
    /// Offset of the table from the left frame edge.
    pub x_offset: f64,
    /// Column widths.
    pub column_widths: Vec<f64>,
    /// Rows.
    pub rows: Vec<MeasuredRow>,
    /// Backgrounds, paddings and lines.
    pub format: ResolvedTable,
}

impl MeasuredTable {
    /// Distance from the table top to the top of `row`.
    pub fn row_offset(&self, rows: Range<usize>, row: usize) -> f64 {
        self.rows[rows.start..row].iter().map(|r| r.height).sum()
    }

    /// Left edge of `column` relative to the table.
    pub fn column_offset(&self, column: usize) -> f64 {
        self.column_widths[..column].iter().sum()
    }

    /// Vertical offset of cell content inside its row.
    pub fn content_offset(&self, row: usize, column: usize) -> f64 {
        let format = &self.format.cells[row][column];
        let cell = &self.rows[row].cells[column];
        let free = self.rows[row].height
            - format.padding.top
            - format.padding.bottom
            - cell.content_height();
        match format.valign {
            VerticalAlignment::Top => format.padding.top,
            VerticalAlignment::Middle => format.padding.top + free.max(0.0) / 2.0,
            VerticalAlignment::Bottom => format.padding.top + free.max(0.0),
        }
    }
}

/// A block after measurement.
#[derive(Clone, Debug, PartialEq)]
pub enum Measured {
    /// Wrapped paragraph.
    Paragraph(MeasuredParagraph),
    /// Vertical gap.
    Spacer(f64),
    /// Measured table.
    Table(MeasuredTable),
    /// Forced page break.
    PageBreak,
}

/// Checks block parameters that do not need fonts.
pub fn validate(blocks: &[Block]) -> Result<(), LayoutError> {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => {
                validate_style(paragraph.style().name(), paragraph.style().style())?;
                parse_markup(paragraph.text())
                    .map_err(|source| LayoutError::Markup { block: index, source })?;
            }
            Block::Spacer(height) => {
                if !height.is_finite() || *height < 0.0 {
                    return Err(LayoutError::InvalidSpacer {
                        block: index,
                        height: *height,
                    });
                }
            }
            Block::Table(table) => {
                table::resolve(index, table)?;
                for cell in table.rows().iter().flatten() {
                    if let Some(style) = cell.style() {
                        validate_style(style.name(), style.style())?;
                    }
                    parse_markup(cell.text())
                        .map_err(|source| LayoutError::Markup { block: index, source })?;
                }
            }
            Block::PageBreak => {}
        }
    }
    Ok(())
}

fn validate_style(name: &str, style: &ParagraphStyle) -> Result<(), LayoutError> {
    let checks = [
        ("font size", f64::from(style.font_size), style.font_size > 0),
        ("leading", style.leading, style.leading.is_finite() && style.leading > 0.0),
        ("left indent", style.left_indent, style.left_indent.is_finite() && style.left_indent >= 0.0),
        ("right indent", style.right_indent, style.right_indent.is_finite() && style.right_indent >= 0.0),
        ("space before", style.space_before, style.space_before.is_finite() && style.space_before >= 0.0),
        ("space after", style.space_after, style.space_after.is_finite() && style.space_after >= 0.0),
    ];
    match checks.iter().find(|(_, _, ok)| !ok) {
        Some((attribute, value, _)) => Err(LayoutError::InvalidStyle {
            style: name.to_owned(),
            attribute: *attribute,
            value: *value,
        }),
        None => Ok(()),
    }
}

/// Wraps all blocks for `frame`. Blocks must have passed [`validate`].
pub fn measure(
    blocks: &[Block],
    frame: Frame,
    measure: &dyn TextMeasure,
) -> Result<Vec<Measured>, LayoutError> {
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| match block {
            Block::Paragraph(paragraph) => {
                measure_paragraph(index, paragraph, frame, measure).map(Measured::Paragraph)
            }
            Block::Spacer(height) => Ok(Measured::Spacer(*height)),
            Block::Table(table) => measure_table(index, table, frame, measure).map(Measured::Table),
            Block::PageBreak => Ok(Measured::PageBreak),
        })
        .collect()
}

fn measure_paragraph(
    index: usize,
    paragraph: &Paragraph,
    frame: Frame,
    measure: &dyn TextMeasure,
) -> Result<MeasuredParagraph, LayoutError> {
    let style = paragraph.style().style();
    let width = frame.width - style.left_indent - style.right_indent;
    if width <= 0.0 {
        return Err(LayoutError::InvalidStyle {
            style: paragraph.style().name().to_owned(),
            attribute: "indentation",
            value: style.left_indent + style.right_indent,
        });
    }

    let spans = parse_markup(paragraph.text())
        .map_err(|source| LayoutError::Markup { block: index, source })?;
    let base = RunFont::new(Some(style.font_family.clone()), style.font_size);
    let lines = wrap(&spans, &base, width, measure);
    let outline_title = if style.outline {
        Some(
            plain_text(paragraph.text())
                .map_err(|source| LayoutError::Markup { block: index, source })?,
        )
    } else {
        None
    };

    Ok(MeasuredParagraph {
        lines,
        style: style.clone(),
        outline_title,
    })
}

fn measure_table(
    index: usize,
    table: &Table,
    frame: Frame,
    measure: &dyn TextMeasure,
) -> Result<MeasuredTable, LayoutError> {
    let format = table::resolve(index, table)?;
    let column_widths = table.column_widths().to_vec();

    let mut rows = Vec::with_capacity(table.rows().len());
    for (row_index, row) in table.rows().iter().enumerate() {
        let mut cells = Vec::with_capacity(row.len());
        let mut height: f64 = 0.0;
        for (column, cell) in row.iter().enumerate() {
            let cell_format = &format.cells[row_index][column];
            let (base, leading, align, text_color) = match cell.style() {
                Some(style) => {
                    let style = style.style();
                    (
                        RunFont::new(Some(style.font_family.clone()), style.font_size),
                        style.leading,
                        style.alignment,
                        style.text_color,
                    )
                }
                None => (
                    RunFont::new(cell_format.font_family.clone(), cell_format.font_size),
                    cell_format.effective_leading(),
                    cell_format.align,
                    cell_format.text_color,
                ),
            };
            let spans = parse_markup(cell.text())
                .map_err(|source| LayoutError::Markup { block: index, source })?;
            let text_width = (column_widths[column]
                - cell_format.padding.left
                - cell_format.padding.right)
                .max(MIN_CELL_TEXT_WIDTH);
            let measured = MeasuredCell {
                lines: wrap(&spans, &base, text_width, measure),
                leading,
                align,
                text_color,
            };
            height = height.max(
                measured.content_height() + cell_format.padding.top + cell_format.padding.bottom,
            );
            cells.push(measured);
        }
        rows.push(MeasuredRow { cells, height });
    }

    let x_offset = ((frame.width - table.width()) / 2.0).max(0.0);
    Ok(MeasuredTable {
        x_offset,
        column_widths,
        rows,
        format,
    })
}

/// Part of a block placed on one page.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    /// A range of paragraph lines.
    Lines(Range<usize>),
    /// A vertical gap.
    Gap(f64),
    /// A range of table rows.
    Rows(Range<usize>),
}

/// A fragment positioned on a page.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Index of the block in the sequence.
    pub block: usize,
    /// Distance from the top of the frame.
    pub top: f64,
    /// What part of the block is placed.
    pub fragment: Fragment,
}

/// Placements for one page, in reading order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Placed fragments.
    pub placements: Vec<Placement>,
}

/// Result of pagination.
#[derive(Clone, Debug, PartialEq)]
pub struct PagePlan {
    /// Pages in order; never empty.
    pub pages: Vec<Page>,
    /// Zero-based page on which each block starts.
    pub block_pages: Vec<usize>,
}

struct Flow {
    frame: Frame,
    pages: Vec<Page>,
    current: Page,
    y: f64,
    pending_space: f64,
}

impl Flow {
    fn page_index(&self) -> usize {
        self.pages.len()
    }

    fn is_fresh(&self) -> bool {
        self.current.placements.is_empty()
    }

    fn remaining(&self) -> f64 {
        self.frame.height - self.y
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = 0.0;
        self.pending_space = 0.0;
    }

    fn gap_before(&self, space_before: f64) -> f64 {
        if self.is_fresh() {
            0.0
        } else {
            self.pending_space.max(space_before)
        }
    }

    fn place(&mut self, block: usize, height: f64, fragment: Fragment) {
        self.current.placements.push(Placement {
            block,
            top: self.y,
            fragment,
        });
        self.y += height;
    }
}

/// Flows measured blocks into pages of `frame`.
pub fn paginate(blocks: &[Measured], frame: Frame) -> Result<PagePlan, LayoutError> {
    let mut flow = Flow {
        frame,
        pages: Vec::new(),
        current: Page::default(),
        y: 0.0,
        pending_space: 0.0,
    };
    let mut block_pages = Vec::with_capacity(blocks.len());

    for (index, block) in blocks.iter().enumerate() {
        match block {
            Measured::Paragraph(paragraph) => {
                let start = flow_paragraph(&mut flow, index, paragraph)?;
                block_pages.push(start);
            }
            Measured::Spacer(height) => {
                let gap = flow.pending_space + height;
                if gap > flow.remaining() + FIT_EPSILON {
                    block_pages.push(flow.page_index());
                    if flow.is_fresh() {
                        debug!("spacer at block {index} is taller than the frame");
                    } else {
                        flow.new_page();
                    }
                } else {
                    block_pages.push(flow.page_index());
                    flow.place(index, gap, Fragment::Gap(*height));
                    flow.pending_space = 0.0;
                }
            }
            Measured::Table(table) => {
                let start = flow_table(&mut flow, index, table)?;
                block_pages.push(start);
            }
            Measured::PageBreak => {
                block_pages.push(flow.page_index());
                if flow.is_fresh() {
                    warn!("page break at block {index} ignored on an empty page");
                } else {
                    flow.new_page();
                }
            }
        }
    }

    if !flow.is_fresh() || flow.pages.is_empty() {
        let last = std::mem::take(&mut flow.current);
        flow.pages.push(last);
    }
    let last_page = flow.pages.len() - 1;
    for page in &mut block_pages {
        *page = (*page).min(last_page);
    }

    Ok(PagePlan {
        pages: flow.pages,
        block_pages,
    })
}

fn flow_paragraph(
    flow: &mut Flow,
    index: usize,
    paragraph: &MeasuredParagraph,
) -> Result<usize, LayoutError> {
    let style = &paragraph.style;
    let leading = style.leading;
    let gap = flow.gap_before(style.space_before);

    if paragraph.lines.is_empty() {
        let start = flow.page_index();
        flow.y = (flow.y + gap).min(flow.frame.height);
        flow.pending_space = style.space_after;
        return Ok(start);
    }

    if gap + leading > flow.remaining() + FIT_EPSILON && !flow.is_fresh() {
        flow.new_page();
    } else {
        flow.y += gap;
    }
    let start = flow.page_index();

    let mut next = 0;
    while next < paragraph.lines.len() {
        let fitting = ((flow.remaining() + FIT_EPSILON) / leading).floor().max(0.0) as usize;
        if fitting == 0 {
            if flow.is_fresh() {
                return Err(LayoutError::Oversized {
                    block: index,
                    what: format!("a line with leading {leading}"),
                });
            }
            flow.new_page();
            continue;
        }
        let end = (next + fitting).min(paragraph.lines.len());
        flow.place(index, (end - next) as f64 * leading, Fragment::Lines(next..end));
        next = end;
        if next < paragraph.lines.len() {
            flow.new_page();
        }
    }

    flow.pending_space = style.space_after;
    Ok(start)
}

fn flow_table(flow: &mut Flow, index: usize, table: &MeasuredTable) -> Result<usize, LayoutError> {
    let gap = flow.gap_before(0.0);
    flow.y += gap;
    flow.pending_space = 0.0;

    let mut start_page = None;
    let mut run_start = 0;
    let mut run_height = 0.0;

    for (row_index, row) in table.rows.iter().enumerate() {
        if row.height > flow.frame.height + FIT_EPSILON {
            return Err(LayoutError::Oversized {
                block: index,
                what: format!("table row {row_index}"),
            });
        }
        if run_height + row.height > flow.remaining() + FIT_EPSILON {
            if row_index > run_start {
                flow.place(index, run_height, Fragment::Rows(run_start..row_index));
                start_page.get_or_insert(flow.page_index());
            }
            if !flow.is_fresh() {
                flow.new_page();
            }
            run_start = row_index;
            run_height = 0.0;
        }
        run_height += row.height;
    }

    let start = *start_page.get_or_insert(flow.page_index());
    flow.place(index, run_height, Fragment::Rows(run_start..table.rows.len()));
    flow.pending_space = 0.0;
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableCell;
    use crate::style::{StyleRef, StyleSheet};
    use crate::table::{CellRegion, TableAttribute, TableRule};
    use crate::wrap::tests::FixedWidth;

    const FRAME: Frame = Frame {
        width: 200.0,
        height: 100.0,
    };

    fn body(sheet: &mut StyleSheet) -> StyleRef {
        sheet
            .register(
                "Body",
                ParagraphStyle::new("Sans", 10)
                    .with_leading(20.0)
                    .with_spacing(6.0, 6.0),
            )
            .expect("register")
    }

    fn plan(blocks: &[Block]) -> PagePlan {
        validate(blocks).expect("valid");
        let measured = measure(blocks, FRAME, &FixedWidth).expect("measure");
        paginate(&measured, FRAME).expect("paginate")
    }

    #[test]
    fn empty_document_has_one_page() {
        let plan = plan(&[]);
        assert_eq!(plan.pages.len(), 1);
        assert!(plan.block_pages.is_empty());
    }

    #[test]
    fn lone_page_break_yields_one_page() {
        let plan = plan(&[Block::PageBreak]);
        assert_eq!(plan.pages.len(), 1);
        assert_eq!(plan.block_pages, vec![0]);
    }

    #[test]
    fn page_break_starts_new_page() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        let plan = plan(&[
            Block::Paragraph(Paragraph::new("uno", &style)),
            Block::PageBreak,
            Block::PageBreak,
            Block::Paragraph(Paragraph::new("dos", &style)),
        ]);
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.block_pages, vec![0, 0, 1, 1]);
    }

    #[test]
    fn spacing_collapses_and_is_dropped_at_page_top() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        let plan = plan(&[
            Block::Paragraph(Paragraph::new("uno", &style)),
            Block::Paragraph(Paragraph::new("dos", &style)),
        ]);
        let placements = &plan.pages[0].placements;
        assert_eq!(placements[0].top, 0.0);
        assert_eq!(placements[1].top, 26.0);
    }

    #[test]
    fn long_paragraph_continues_on_next_page() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        // 40 chars per line at 5pt each; 7 words of 38 chars -> 7 lines.
        let word = "a".repeat(38);
        let text = vec![word; 7].join(" ");
        let plan = plan(&[Block::Paragraph(Paragraph::new(text, &style))]);
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.pages[0].placements[0].fragment, Fragment::Lines(0..5));
        assert_eq!(plan.pages[1].placements[0].fragment, Fragment::Lines(5..7));
        assert_eq!(plan.pages[1].placements[0].top, 0.0);
    }

    #[test]
    fn oversized_spacer_ends_the_page() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        let plan = plan(&[
            Block::Paragraph(Paragraph::new("uno", &style)),
            Block::Spacer(500.0),
            Block::Paragraph(Paragraph::new("dos", &style)),
        ]);
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.block_pages, vec![0, 0, 1]);
        assert_eq!(plan.pages[1].placements[0].top, 0.0);
    }

    #[test]
    fn table_rows_are_never_split() {
        let rules = vec![
            TableRule::new(CellRegion::all(), TableAttribute::TopPadding(4.0)),
            TableRule::new(CellRegion::all(), TableAttribute::BottomPadding(4.0)),
        ];
        // Each row: 12 leading + 8 padding = 20pt; five rows fill one page.
        let rows = (0..7)
            .map(|r| vec![TableCell::new(format!("r{r}")), TableCell::new("x")])
            .collect();
        let blocks = [
            Block::Spacer(30.0),
            Block::Table(Table::new(rows, vec![60.0, 60.0], rules)),
        ];
        let plan = plan(&blocks);
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.pages[0].placements[1].fragment, Fragment::Rows(0..3));
        assert_eq!(plan.pages[1].placements[0].fragment, Fragment::Rows(3..7));
        assert_eq!(plan.block_pages, vec![0, 0]);

        let Measured::Table(table) = &measure(&blocks, FRAME, &FixedWidth).unwrap()[1] else {
            panic!("expected table");
        };
        assert_eq!(table.x_offset, 40.0);
        assert_eq!(table.row_offset(3..7, 5), 40.0);
        assert_eq!(table.column_offset(1), 60.0);
    }

    #[test]
    fn oversized_row_is_a_layout_error() {
        let rows = vec![vec![TableCell::new("x")]];
        let rules = vec![TableRule::new(CellRegion::all(), TableAttribute::TopPadding(200.0))];
        let blocks = [Block::Table(Table::new(rows, vec![50.0], rules))];
        let measured = measure(&blocks, FRAME, &FixedWidth).unwrap();
        assert!(matches!(
            paginate(&measured, FRAME),
            Err(LayoutError::Oversized { block: 0, .. })
        ));
    }

    #[test]
    fn block_pages_follow_append_order() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        let blocks: Vec<_> = (0..30)
            .map(|i| Block::Paragraph(Paragraph::new(format!("bloque {i}"), &style)))
            .collect();
        let plan = plan(&blocks);
        assert!(plan.pages.len() > 1);
        assert!(plan.block_pages.windows(2).all(|w| w[0] <= w[1]));
        let placed: Vec<_> = plan
            .pages
            .iter()
            .flat_map(|page| page.placements.iter().map(|p| p.block))
            .collect();
        assert_eq!(placed, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn invalid_spacer_and_markup_are_rejected() {
        let mut sheet = StyleSheet::new();
        let style = body(&mut sheet);
        assert!(matches!(
            validate(&[Block::Spacer(-1.0)]),
            Err(LayoutError::InvalidSpacer { block: 0, .. })
        ));
        assert!(matches!(
            validate(&[
                Block::Spacer(1.0),
                Block::Paragraph(Paragraph::new("<b>sin cerrar", &style))
            ]),
            Err(LayoutError::Markup { block: 1, .. })
        ));
    }

    #[test]
    fn outline_titles_drop_markup() {
        let mut sheet = StyleSheet::new();
        let heading = sheet
            .register("Heading", ParagraphStyle::new("Sans", 14).with_outline(true))
            .unwrap();
        let plain = body(&mut sheet);
        let blocks = [
            Block::Paragraph(Paragraph::new("3. <b>Ko</b>-fi<br/>y &amp; más", &heading)),
            Block::Paragraph(Paragraph::new("<b>Ko</b>-fi", &plain)),
        ];
        let measured = measure(&blocks, FRAME, &FixedWidth).unwrap();
        let titles: Vec<Option<&str>> = measured
            .iter()
            .map(|block| match block {
                Measured::Paragraph(paragraph) => paragraph.outline_title.as_deref(),
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec![Some("3. Ko-fi y & más"), None]);
    }

    #[test]
    fn cell_style_overrides_table_format() {
        let mut sheet = StyleSheet::new();
        let header = sheet
            .register(
                "Header",
                ParagraphStyle::new("Sans", 10)
                    .with_alignment(HorizontalAlignment::Center)
                    .with_text_color(Color::WHITE),
            )
            .unwrap();
        let rows = vec![vec![TableCell::styled("<b>Programa</b>", &header), TableCell::new("x")]];
        let blocks = [Block::Table(Table::new(rows, vec![100.0, 100.0], Vec::new()))];
        let Measured::Table(table) = &measure(&blocks, FRAME, &FixedWidth).unwrap()[0] else {
            panic!("expected table");
        };
        let styled = &table.rows[0].cells[0];
        assert_eq!(styled.align, HorizontalAlignment::Center);
        assert_eq!(styled.text_color, Color::WHITE);
        assert_eq!(styled.lines[0].runs[0].font.family.as_deref(), Some("Sans"));
        let plain = &table.rows[0].cells[1];
        assert_eq!(plain.align, HorizontalAlignment::Left);
        assert_eq!(plain.lines[0].runs[0].font.family, None);
    }
}
