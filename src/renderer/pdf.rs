//! Paginated document export options

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use serde::{Deserialize, Serialize};

/// Paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    Letter,
    Legal,
    A4,
}

impl PageFormat {
    /// (width, height) in inches
    pub fn dimensions_inches(self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
            Self::A4 => (8.27, 11.69),
        }
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(0.4)
    }
}

/// Document export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    pub format: PageFormat,
    pub landscape: bool,
    /// Rendering scale, clamped to the engine's accepted range [0.1, 2.0]
    pub scale: f64,
    pub margins: Margins,
    pub print_background: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::Letter,
            landscape: false,
            scale: 1.0,
            margins: Margins::default(),
            print_background: true,
        }
    }
}

impl DocumentOptions {
    pub fn to_print_params(&self) -> PrintToPdfParams {
        let (width, height) = self.format.dimensions_inches();
        PrintToPdfParams {
            landscape: Some(self.landscape),
            print_background: Some(self.print_background),
            scale: Some(self.scale.clamp(0.1, 2.0)),
            paper_width: Some(width),
            paper_height: Some(height),
            margin_top: Some(self.margins.top),
            margin_right: Some(self.margins.right),
            margin_bottom: Some(self.margins.bottom),
            margin_left: Some(self.margins.left),
            ..Default::default()
        }
    }
}
