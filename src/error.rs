//! Error types reported by the assembler and the rendering pipeline.
//!
//! Every failure is terminal: nothing is retried and no partial output is written.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::richtext::ParseError;

/// Problems with styles, fonts configuration, or the content description.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A style with the same name was already registered.
    #[error("style `{0}` is already registered")]
    DuplicateStyle(String),
    /// Content referenced a style that was never registered.
    #[error("style `{0}` is not registered")]
    UnknownStyle(String),
    /// A style references a font family missing from the font configuration.
    #[error("style `{style}` uses font family `{family}`, which is not configured")]
    UnknownFontFamily {
        /// Name of the offending style (or `table` for table font directives).
        style: String,
        /// The unknown family name.
        family: String,
    },
    /// The font configuration does not contain a single family.
    #[error("no font families are configured")]
    NoFontFamilies,
    /// A colour literal could not be parsed.
    #[error("invalid colour `{0}`; expected #rrggbb or a known colour name")]
    InvalidColor(String),
    /// A table rule in the content description cannot be interpreted.
    #[error("table rule {rule} in block {block} is invalid: {message}")]
    InvalidTableRule {
        /// Index of the block in the content description.
        block: usize,
        /// Index of the rule within the table.
        rule: usize,
        /// What is wrong with it.
        message: String,
    },
    /// Paper size or margins leave no room for content.
    #[error("page setup leaves no content area ({width} x {height} points)")]
    InvalidPageSetup {
        /// Resulting frame width.
        width: f64,
        /// Resulting frame height.
        height: f64,
    },
    /// The content description is not valid JSON for the expected schema.
    #[error("malformed content description: {0}")]
    Content(#[from] serde_json::Error),
}

/// A font asset could not be located or loaded.
#[derive(Debug, Error)]
pub enum FontError {
    /// None of the candidate locations contained the font file.
    #[error("font file `{file}` for family `{family}` not found (checked: {})", display_paths(.searched))]
    Missing {
        /// Font family being loaded.
        family: String,
        /// File name that was looked up.
        file: String,
        /// Every location that was checked.
        searched: Vec<PathBuf>,
    },
    /// The file exists but could not be parsed or embedded.
    #[error("failed to load font `{}` for family `{family}`", .path.display())]
    Load {
        /// Font family being loaded.
        family: String,
        /// Resolved path of the font file.
        path: PathBuf,
        /// Backend error.
        #[source]
        source: genpdf::error::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search paths were available".to_owned();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Blocks whose parameters cannot be laid out.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A table row does not have one cell per column width.
    #[error("table (block {block}) row {row} has {found} cells but {expected} column widths were given")]
    RowWidthMismatch {
        /// Index of the table in the block sequence.
        block: usize,
        /// Index of the offending row.
        row: usize,
        /// Number of column widths.
        expected: usize,
        /// Number of cells in the row.
        found: usize,
    },
    /// A table without rows or columns.
    #[error("table (block {block}) has no rows or no columns")]
    EmptyTable {
        /// Index of the table in the block sequence.
        block: usize,
    },
    /// Column widths must be finite and positive.
    #[error("table (block {block}) column {column} has invalid width {width}")]
    InvalidColumnWidth {
        /// Index of the table in the block sequence.
        block: usize,
        /// Column index.
        column: usize,
        /// The rejected width.
        width: f64,
    },
    /// A style rule addresses cells outside the table.
    #[error("table (block {block}) style rule {rule} addresses cells outside the table")]
    RegionOutOfBounds {
        /// Index of the table in the block sequence.
        block: usize,
        /// Index of the rule in the rule list.
        rule: usize,
    },
    /// Spacer heights must be finite and non-negative.
    #[error("spacer (block {block}) has invalid height {height}")]
    InvalidSpacer {
        /// Index of the spacer in the block sequence.
        block: usize,
        /// The rejected height.
        height: f64,
    },
    /// A numeric style attribute is out of range.
    #[error("style `{style}` has invalid {attribute} {value}")]
    InvalidStyle {
        /// Style name.
        style: String,
        /// Attribute name.
        attribute: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A table style rule carries an out-of-range number.
    #[error("table (block {block}) style rule {rule} has invalid {attribute} {value}")]
    InvalidTableValue {
        /// Index of the table in the block sequence.
        block: usize,
        /// Index of the rule in the rule list.
        rule: usize,
        /// Attribute name.
        attribute: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Inline markup could not be interpreted.
    #[error("block {block} contains malformed markup")]
    Markup {
        /// Index of the block in the sequence.
        block: usize,
        /// Parser diagnostics.
        #[source]
        source: ParseError,
    },
    /// Content that cannot fit on an empty page.
    #[error("block {block}: {what} is taller than the page content area")]
    Oversized {
        /// Index of the block in the sequence.
        block: usize,
        /// Which part overflowed (line, table row).
        what: String,
    },
}

/// Failure of [`DocumentAssembler::render`](crate::builder::DocumentAssembler::render).
#[derive(Debug, Error)]
pub enum RenderError {
    /// Style or content configuration problem.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Font asset problem.
    #[error(transparent)]
    Font(#[from] FontError),
    /// Block parameters that cannot be laid out.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The output could not be written.
    #[error("failed to write {}", .path.display())]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The PDF backend failed while drawing pages.
    #[error("PDF backend failure")]
    Backend(#[source] genpdf::error::Error),
    /// The rendered bytes could not be post-processed.
    #[error("failed to finalize PDF metadata")]
    Finalize(#[from] lopdf::Error),
}
