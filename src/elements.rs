//! `genpdf` element that draws the paginated block flow.
//!
//! Measuring needs the document's font cache, which `genpdf` only exposes while
//! rendering. The [`FlowElement`] therefore lays out the whole block sequence on
//! its first `render` call and then draws one page per call until the plan is
//! exhausted. Layout failures, the page report and the fills and rules of each
//! page are handed back to the assembler through a shared [`FlowReport`].
//! `genpdf` strokes every line with its default width and cannot fill, so those
//! shapes are painted afterwards by the finalize pass.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{Font, FontCache, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{render, Element, Mm, Position, RenderResult};
use log::debug;

use crate::config::PageSetup;
use crate::error::LayoutError;
use crate::finalize::Shape;
use crate::layout::{self, Fragment, Measured, MeasuredParagraph, MeasuredTable, PagePlan, Placement};
use crate::model::Block;
use crate::style::Color;
use crate::table::LineSpec;
use crate::wrap::{Line, RunFont, TextMeasure};

const MM_PER_PT: f64 = 25.4 / 72.0;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

pub(crate) fn mm_from_pt(points: f64) -> Mm {
    mm_from_f64(points * MM_PER_PT)
}

pub(crate) fn pt_from_mm(value: Mm) -> f64 {
    mm_to_f64(value) / MM_PER_PT
}

fn position(x: f64, y: f64) -> Position {
    Position::new(mm_from_pt(x), mm_from_pt(y))
}

/// Font families added to the document, by name.
///
/// The document's default family is not listed; runs naming it, or naming no
/// family at all, use the default style font.
#[derive(Clone, Default)]
pub(crate) struct FontRegistry {
    families: HashMap<String, FontFamily<Font>>,
}

impl FontRegistry {
    pub(crate) fn insert(&mut self, name: impl Into<String>, family: FontFamily<Font>) {
        self.families.insert(name.into(), family);
    }

    fn style(&self, font: &RunFont) -> Style {
        let mut style = Style::new().with_font_size(font.size);
        if let Some(family) = font.family.as_deref().and_then(|name| self.families.get(name)) {
            style = style.with_font_family(*family);
        }
        if font.bold {
            style.set_bold();
        }
        if font.italic {
            style.set_italic();
        }
        style
    }
}

/// [`TextMeasure`] backed by the fonts embedded in the document.
struct GenpdfMeasure<'a> {
    font_cache: &'a FontCache,
    fonts: &'a FontRegistry,
}

impl TextMeasure for GenpdfMeasure<'_> {
    fn text_width(&self, text: &str, font: &RunFont) -> f64 {
        pt_from_mm(StyledString::new(text, self.fonts.style(font)).width(self.font_cache))
    }
}

/// Outcome of the layout pass, read by the assembler after rendering.
#[derive(Debug, Default)]
pub(crate) struct FlowReport {
    pub(crate) error: Option<LayoutError>,
    pub(crate) page_count: usize,
    pub(crate) block_pages: Vec<usize>,
    pub(crate) outlines: Vec<(String, usize)>,
    /// Backgrounds and table lines of each drawn page, in PDF user space.
    pub(crate) page_shapes: Vec<Vec<Shape>>,
}

pub(crate) type SharedReport = Rc<RefCell<FlowReport>>;

/// Draws the block sequence, one page per `render` call.
pub(crate) struct FlowElement {
    blocks: Vec<Block>,
    page: PageSetup,
    fonts: FontRegistry,
    report: SharedReport,
    layout: Option<(Vec<Measured>, PagePlan)>,
    next_page: usize,
}

impl FlowElement {
    pub(crate) fn new(
        blocks: Vec<Block>,
        page: PageSetup,
        fonts: FontRegistry,
        report: SharedReport,
    ) -> Self {
        Self {
            blocks,
            page,
            fonts,
            report,
            layout: None,
            next_page: 0,
        }
    }

    fn prepare(&self, font_cache: &FontCache) -> Result<(Vec<Measured>, PagePlan), Error> {
        let frame = self.page.frame();
        let measure = GenpdfMeasure {
            font_cache,
            fonts: &self.fonts,
        };

        let outcome = layout::measure(&self.blocks, frame, &measure).and_then(|measured| {
            let plan = layout::paginate(&measured, frame)?;
            Ok((measured, plan))
        });

        let mut report = self.report.borrow_mut();
        match outcome {
            Ok((measured, plan)) => {
                debug!(
                    "laid out {} blocks on {} pages",
                    measured.len(),
                    plan.pages.len()
                );
                report.page_count = plan.pages.len();
                report.block_pages = plan.block_pages.clone();
                report.outlines = measured
                    .iter()
                    .zip(&plan.block_pages)
                    .filter_map(|(block, page)| match block {
                        Measured::Paragraph(MeasuredParagraph {
                            outline_title: Some(title),
                            ..
                        }) => Some((title.clone(), *page)),
                        _ => None,
                    })
                    .collect();
                Ok((measured, plan))
            }
            Err(err) => {
                let message = err.to_string();
                report.error = Some(err);
                Err(Error::new(message, ErrorKind::InvalidData))
            }
        }
    }
}

impl Element for FlowElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        if self.layout.is_none() {
            self.layout = Some(self.prepare(&context.font_cache)?);
        }
        let Some((measured, plan)) = &self.layout else {
            return Ok(RenderResult::default());
        };

        let mut painter = Painter {
            area: &area,
            font_cache: &context.font_cache,
            fonts: &self.fonts,
            frame_width: self.page.frame().width,
            shapes: ShapeRecorder::new(&self.page),
        };
        if let Some(page) = plan.pages.get(self.next_page) {
            for placement in &page.placements {
                painter.placement(measured, placement)?;
            }
        }
        self.report.borrow_mut().page_shapes.push(painter.shapes.shapes);

        self.next_page += 1;
        let mut result = RenderResult::default();
        result.size = area.size();
        result.has_more = self.next_page < plan.pages.len();
        Ok(result)
    }
}

/// Collects the fills and rules of one page, converted from frame
/// coordinates (points down from the frame's top-left corner) to PDF user space.
struct ShapeRecorder {
    origin: (f64, f64),
    shapes: Vec<Shape>,
}

impl ShapeRecorder {
    fn new(page: &PageSetup) -> Self {
        Self {
            origin: (page.margins.left, page.height - page.margins.top),
            shapes: Vec::new(),
        }
    }

    fn user_space(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (self.origin.0 + x, self.origin.1 - y)
    }

    fn fill(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let (x, y) = self.user_space((x, y + height));
        self.shapes.push(Shape::Fill {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn rule(&mut self, spec: LineSpec, from: (f64, f64), to: (f64, f64)) {
        let (from, to) = (self.user_space(from), self.user_space(to));
        self.shapes.push(Shape::Line {
            from,
            to,
            width: spec.width,
            color: spec.color,
        });
    }
}

struct Painter<'a, 'p> {
    area: &'a render::Area<'p>,
    font_cache: &'a FontCache,
    fonts: &'a FontRegistry,
    frame_width: f64,
    shapes: ShapeRecorder,
}

impl Painter<'_, '_> {
    fn placement(&mut self, measured: &[Measured], placement: &Placement) -> Result<(), Error> {
        match (&measured[placement.block], &placement.fragment) {
            (Measured::Paragraph(paragraph), Fragment::Lines(lines)) => {
                self.paragraph(paragraph, lines.clone(), placement.top)
            }
            (Measured::Table(table), Fragment::Rows(rows)) => {
                self.table(table, rows.clone(), placement.top)
            }
            _ => Ok(()),
        }
    }

    fn paragraph(
        &mut self,
        paragraph: &MeasuredParagraph,
        lines: std::ops::Range<usize>,
        top: f64,
    ) -> Result<(), Error> {
        let style = &paragraph.style;
        let width = self.frame_width - style.left_indent - style.right_indent;
        if let Some(background) = style.background {
            let height = lines.len() as f64 * style.leading;
            self.shapes.fill(style.left_indent, top, width, height, background);
        }

        for (offset, line) in paragraph.lines[lines].iter().enumerate() {
            let x = style.left_indent + style.alignment.offset(width, line.width);
            let line_top = top + offset as f64 * style.leading;
            self.text(line, x, line_top, style.leading, style.text_color)?;
        }
        Ok(())
    }

    fn table(
        &mut self,
        table: &MeasuredTable,
        rows: std::ops::Range<usize>,
        top: f64,
    ) -> Result<(), Error> {
        let x0 = table.x_offset;
        let row_top = |row: usize| top + table.row_offset(rows.clone(), row);

        for row in rows.clone() {
            let y = row_top(row);
            let height = table.rows[row].height;
            for (column, width) in table.column_widths.iter().enumerate() {
                if let Some(background) = table.format.cells[row][column].background {
                    self.shapes.fill(x0 + table.column_offset(column), y, *width, height, background);
                }
            }
        }

        for row in rows.clone() {
            let y = row_top(row);
            for (column, cell) in table.rows[row].cells.iter().enumerate() {
                let padding = table.format.cells[row][column].padding;
                let left = x0 + table.column_offset(column) + padding.left;
                let available = table.column_widths[column] - padding.left - padding.right;
                let content_top = y + table.content_offset(row, column);
                for (index, line) in cell.lines.iter().enumerate() {
                    let x = left + cell.align.offset(available, line.width);
                    let line_top = content_top + index as f64 * cell.leading;
                    self.text(line, x, line_top, cell.leading, cell.text_color)?;
                }
            }
        }

        for boundary in rows.start..=rows.end {
            let y = row_top(boundary);
            for (column, width) in table.column_widths.iter().enumerate() {
                if let Some(spec) = table.format.horizontal[boundary][column] {
                    let x = x0 + table.column_offset(column);
                    self.shapes.rule(spec, (x, y), (x + width, y));
                }
            }
        }
        for row in rows.clone() {
            let y = row_top(row);
            let height = table.rows[row].height;
            for boundary in 0..=table.column_widths.len() {
                if let Some(spec) = table.format.vertical[row][boundary] {
                    let x = x0 + table.column_offset(boundary);
                    self.shapes.rule(spec, (x, y), (x, y + height));
                }
            }
        }
        Ok(())
    }

    fn text(&self, line: &Line, x: f64, top: f64, leading: f64, color: Color) -> Result<(), Error> {
        let mut cursor = x;
        for run in &line.runs {
            let style = self.fonts.style(&run.font).with_color(color.to_genpdf());
            let text_top = top + (leading - f64::from(run.font.size)).max(0.0) / 2.0;
            let printed =
                self.area
                    .print_str(self.font_cache, position(cursor, text_top), style, &run.text)?;
            if !printed {
                return Err(Error::new(
                    format!("no room left on the page for `{}`", run.text),
                    ErrorKind::PageSizeExceeded,
                ));
            }
            cursor += pt_from_mm(StyledString::new(run.text.as_str(), style).width(self.font_cache));
        }
        Ok(())
    }
}
