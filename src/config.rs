//! Render configuration: page geometry, document metadata and fonts.

use serde::Deserialize;

use crate::fonts::FontConfig;
use crate::layout::Frame;

/// A4 width in points.
pub const A4_WIDTH: f64 = 595.28;
/// A4 height in points.
pub const A4_HEIGHT: f64 = 841.89;
/// One inch, the default margin on every side.
pub const DEFAULT_MARGIN: f64 = 72.0;

/// Page margins in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    /// Top margin.
    pub top: f64,
    /// Right margin.
    pub right: f64,
    /// Bottom margin.
    pub bottom: f64,
    /// Left margin.
    pub left: f64,
}

impl Margins {
    /// The same margin on all four sides.
    pub fn all(value: f64) -> Self {
        Self::trbl(value, value, value, value)
    }

    /// Margins given in CSS order.
    pub fn trbl(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::all(DEFAULT_MARGIN)
    }
}

/// Paper size and margins, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSetup {
    /// Paper width.
    pub width: f64,
    /// Paper height.
    pub height: f64,
    /// Margins around the content frame.
    pub margins: Margins,
}

impl PageSetup {
    /// A4 portrait with one-inch margins.
    pub fn a4() -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
            margins: Margins::default(),
        }
    }

    /// Sets the margins and returns the updated setup.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// The area blocks flow into.
    pub fn frame(&self) -> Frame {
        Frame {
            width: self.width - self.margins.left - self.margins.right,
            height: self.height - self.margins.top - self.margins.bottom,
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::a4()
    }
}

/// Document information written into the PDF `/Info` dictionary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Document title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Creating application or organisation.
    pub creator: String,
    /// Subject line.
    pub subject: String,
    /// Producer; omitted from the output when unset.
    pub producer: Option<String>,
}


/// Everything the assembler needs besides the blocks themselves.
#[derive(Clone, Debug, Default)]
pub struct RenderConfig {
    /// Page geometry.
    pub page: PageSetup,
    /// Document information.
    pub metadata: Metadata,
    /// Font families available to styles.
    pub fonts: FontConfig,
}

impl RenderConfig {
    /// Configuration with default A4 pages and the given fonts.
    pub fn new(fonts: FontConfig) -> Self {
        Self {
            page: PageSetup::a4(),
            metadata: Metadata::default(),
            fonts,
        }
    }

    /// Sets the page setup and returns the updated configuration.
    pub fn with_page(mut self, page: PageSetup) -> Self {
        self.page = page;
        self
    }

    /// Sets the metadata and returns the updated configuration.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_frame_excludes_margins() {
        let frame = PageSetup::a4().frame();
        assert!((frame.width - (A4_WIDTH - 144.0)).abs() < 1e-9);
        assert!((frame.height - (A4_HEIGHT - 144.0)).abs() < 1e-9);

        let narrow = PageSetup::a4().with_margins(Margins::trbl(10.0, 20.0, 30.0, 40.0));
        assert!((narrow.frame().width - (A4_WIDTH - 60.0)).abs() < 1e-9);
        assert!((narrow.frame().height - (A4_HEIGHT - 40.0)).abs() < 1e-9);
    }

    #[test]
    fn metadata_fields_default_when_missing() {
        let metadata: Metadata =
            serde_json::from_str(r#"{"title": "Guia", "author": "Z.ai"}"#).unwrap();
        assert_eq!(metadata.title, "Guia");
        assert_eq!(metadata.author, "Z.ai");
        assert!(metadata.subject.is_empty());
        assert_eq!(metadata.producer, None);
    }
}
