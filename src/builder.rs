//! Document assembly and the render pipeline.
//!
//! [`DocumentAssembler`] collects styles and blocks and renders them in one
//! pass: validate, load fonts, lay out and draw through `genpdf`, finalize the
//! metadata with `lopdf`, then write the file atomically.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use genpdf::error::Error;
use genpdf::style;
use genpdf::{PageDecorator, Position, Size};
use log::{debug, info};

use crate::config::{Margins, Metadata, RenderConfig};
use crate::elements::{mm_from_pt, FlowElement, FontRegistry, SharedReport};
use crate::error::{ConfigurationError, RenderError};
use crate::finalize::{self, OutlineEntry};
use crate::layout;
use crate::model::{Block, Paragraph, Table, TableCell};
use crate::style::{ParagraphStyle, StyleRef, StyleSheet};
use crate::table::{TableAttribute, TableRule};

/// Where each block ended up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageReport {
    /// Number of pages in the document.
    pub page_count: usize,
    /// Zero-based page on which each block starts, in append order.
    pub block_pages: Vec<usize>,
}

/// A rendered document held in memory.
#[derive(Clone, Debug)]
pub struct RenderedPdf {
    /// The PDF file contents.
    pub bytes: Vec<u8>,
    /// Pagination summary.
    pub report: PageReport,
}

/// Accumulates styles and blocks, then renders them once.
#[derive(Debug)]
pub struct DocumentAssembler {
    config: RenderConfig,
    styles: StyleSheet,
    blocks: Vec<Block>,
}

impl DocumentAssembler {
    /// Creates an empty assembler for the given configuration.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            styles: StyleSheet::new(),
            blocks: Vec::new(),
        }
    }

    /// The render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replaces the document metadata.
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.config.metadata = metadata;
    }

    /// Registers a named style. Names must be unique.
    pub fn register_style(
        &mut self,
        name: impl Into<String>,
        style: ParagraphStyle,
    ) -> Result<StyleRef, ConfigurationError> {
        self.styles.register(name, style)
    }

    /// Looks up a registered style.
    pub fn style(&self, name: &str) -> Option<&StyleRef> {
        self.styles.get(name)
    }

    /// The registered styles.
    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// The blocks appended so far.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a paragraph. Markup is checked at render time.
    pub fn append_paragraph(&mut self, text: impl Into<String>, style: &StyleRef) -> &mut Self {
        self.blocks.push(Block::Paragraph(Paragraph::new(text, style)));
        self
    }

    /// Appends vertical space, in points.
    pub fn append_spacer(&mut self, height: f64) -> &mut Self {
        self.blocks.push(Block::Spacer(height));
        self
    }

    /// Appends a table. Column widths are in points.
    pub fn append_table(
        &mut self,
        rows: Vec<Vec<TableCell>>,
        column_widths: Vec<f64>,
        rules: Vec<TableRule>,
    ) -> &mut Self {
        self.blocks
            .push(Block::Table(Table::new(rows, column_widths, rules)));
        self
    }

    /// Forces the next block onto a new page.
    pub fn append_page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    /// Checks configuration and block parameters without touching fonts.
    pub fn validate(&self) -> Result<(), RenderError> {
        let fonts = &self.config.fonts;
        if fonts.families().is_empty() {
            return Err(ConfigurationError::NoFontFamilies.into());
        }

        let frame = self.config.page.frame();
        if !(frame.width > 0.0 && frame.height > 0.0) {
            return Err(ConfigurationError::InvalidPageSetup {
                width: frame.width,
                height: frame.height,
            }
            .into());
        }

        let block_styles = self.blocks.iter().flat_map(|block| match block {
            Block::Paragraph(paragraph) => vec![paragraph.style()],
            Block::Table(table) => table.rows().iter().flatten().filter_map(TableCell::style).collect(),
            Block::Spacer(_) | Block::PageBreak => Vec::new(),
        });
        for style in self.styles.iter().chain(block_styles) {
            let family = &style.style().font_family;
            if !fonts.contains(family) {
                return Err(ConfigurationError::UnknownFontFamily {
                    style: style.name().to_owned(),
                    family: family.clone(),
                }
                .into());
            }
        }

        for (index, block) in self.blocks.iter().enumerate() {
            let Block::Table(table) = block else {
                continue;
            };
            for rule in table.rules() {
                if let TableAttribute::FontName(family) = &rule.attribute {
                    if !fonts.contains(family) {
                        return Err(ConfigurationError::UnknownFontFamily {
                            style: format!("table (block {index})"),
                            family: family.clone(),
                        }
                        .into());
                    }
                }
            }
        }

        layout::validate(&self.blocks)?;
        Ok(())
    }

    /// Renders the document into memory.
    pub fn render_to_vec(self) -> Result<RenderedPdf, RenderError> {
        self.validate()?;
        debug!("validated {} blocks", self.blocks.len());

        let mut families = self.config.fonts.load()?.into_iter();
        let (default_name, default_family) =
            families.next().ok_or(ConfigurationError::NoFontFamilies)?;
        debug!("default font family is `{default_name}`");

        let page = self.config.page;
        let mut document = genpdf::Document::new(default_family);
        document.set_title(self.config.metadata.title.clone());
        document.set_paper_size(Size::new(mm_from_pt(page.width), mm_from_pt(page.height)));
        document.set_page_decorator(FramePageDecorator::new(page.margins));

        let mut registry = FontRegistry::default();
        for (name, family) in families {
            registry.insert(name, document.add_font_family(family));
        }

        let report = SharedReport::default();
        document.push(FlowElement::new(
            self.blocks,
            page,
            registry,
            Rc::clone(&report),
        ));

        let mut raw = Vec::new();
        if let Err(err) = document.render(&mut raw) {
            if let Some(layout_error) = report.borrow_mut().error.take() {
                return Err(layout_error.into());
            }
            return Err(RenderError::Backend(err));
        }

        let flow = report.take();
        let outlines: Vec<OutlineEntry> = flow
            .outlines
            .into_iter()
            .map(|(title, page)| OutlineEntry { title, page })
            .collect();
        let bytes = finalize::finalize(
            &raw,
            &self.config.metadata,
            &outlines,
            &flow.page_shapes,
        )?;

        Ok(RenderedPdf {
            bytes,
            report: PageReport {
                page_count: flow.page_count,
                block_pages: flow.block_pages,
            },
        })
    }

    /// Renders the document and writes it to `path`.
    ///
    /// The file is only created once the whole document has been produced; on
    /// failure an existing file at `path` is left as it was.
    pub fn render(self, path: impl AsRef<Path>) -> Result<PageReport, RenderError> {
        let path = path.as_ref();
        let rendered = self.render_to_vec()?;
        write_atomically(path, &rendered.bytes)?;
        info!(
            "wrote {} ({} pages, {} bytes)",
            path.display(),
            rendered.report.page_count,
            rendered.bytes.len()
        );
        Ok(rendered.report)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let io_error = |source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(&directory).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}

/// Offsets each page by the top and left margins and counts pages.
///
/// The bottom and right margins are enforced by the layout, so text in the
/// last line of a page keeps the room its glyph descenders need.
struct FramePageDecorator {
    page: usize,
    margins: Margins,
}

impl FramePageDecorator {
    fn new(margins: Margins) -> Self {
        Self { page: 0, margins }
    }
}

impl PageDecorator for FramePageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        debug!("starting page {}", self.page);
        area.add_offset(Position::new(
            mm_from_pt(self.margins.left),
            mm_from_pt(self.margins.top),
        ));
        Ok(area)
    }
}
