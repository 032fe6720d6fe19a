//! Core entry point for the guide_pdf crate.
//!
//! Styles and blocks are collected by a [`DocumentAssembler`], laid out into
//! A4 pages and drawn through `genpdf`. [`content`] loads the embedded
//! monetization guide from its JSON description.

pub mod builder;
pub mod config;
pub mod content;
mod elements;
pub mod error;
pub mod finalize;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod richtext;
pub mod style;
pub mod table;
pub mod wrap;

pub use builder::{DocumentAssembler, PageReport, RenderedPdf};
pub use config::{Margins, Metadata, PageSetup, RenderConfig};
pub use content::{guide_assembler, load_content, GUIDE_CONTENT};
pub use error::{ConfigurationError, FontError, LayoutError, RenderError};
pub use fonts::{FontConfig, FontSource};
pub use model::{Block, TableCell};
pub use style::{Color, HorizontalAlignment, ParagraphStyle, StyleRef};
pub use table::{CellRegion, LineSpec, TableAttribute, TableRule, VerticalAlignment};
