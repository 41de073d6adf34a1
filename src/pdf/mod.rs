//! HTML to PDF rendering
//!
//! Rasterizes certificate markup into a fixed-size PDF through an
//! out-of-process headless browser.

pub mod chromium;
pub mod mock;

pub use chromium::ChromiumEngine;
pub use mock::MockPdfEngine;

use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// CSS pixels per PDF point at 96 dpi.
const POINTS_PER_PX: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub width_px: u32,
    pub height_px: u32,
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            width_px: 800,
            height_px: 560,
            print_background: true,
        }
    }
}

impl PdfOptions {
    pub fn page_size_points(&self) -> (f64, f64) {
        (
            self.width_px as f64 * POINTS_PER_PX,
            self.height_px as f64 * POINTS_PER_PX,
        )
    }

    fn page_style(&self) -> String {
        let mut style = format!(
            "@page {{ size: {}px {}px; margin: 0; }}",
            self.width_px, self.height_px
        );
        if self.print_background {
            style.push_str(
                " html, body { -webkit-print-color-adjust: exact; print-color-adjust: exact; }",
            );
        }
        format!("<style>{}</style>", style)
    }
}

/// Pin page size and background printing inside the document itself.
///
/// The style goes right before `</head>` so it wins over template rules; a
/// document without a head gets it prepended.
pub fn with_page_style(html: &str, options: &PdfOptions) -> String {
    let style = options.page_style();
    match html.to_ascii_lowercase().find("</head>") {
        Some(index) => format!("{}{}{}", &html[..index], style, &html[index..]),
        None => format!("{}{}", style, html),
    }
}

#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Render `html` into a PDF at `output`, replacing any existing file.
    async fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<()>;
}
