use super::{PdfEngine, PdfOptions};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writes a one-page PDF skeleton of the requested size, with the rendered
/// markup embedded as comment lines so tests can inspect what was printed.
#[derive(Clone)]
pub struct MockPdfEngine {
    render_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    delay: Option<Duration>,
}

impl MockPdfEngine {
    pub fn new() -> Self {
        Self {
            render_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
            delay: None,
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Sleep before writing, to simulate a hung browser.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_render_count(&self) -> usize {
        *self.render_count.lock().unwrap()
    }
}

impl Default for MockPdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn skeleton_pdf(html: &str, options: &PdfOptions) -> String {
    let (width, height) = options.page_size_points();
    let mut pdf = String::from("%PDF-1.4\n");
    for line in html.lines() {
        pdf.push_str("% ");
        pdf.push_str(line);
        pdf.push('\n');
    }
    pdf.push_str("1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    pdf.push_str("2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    pdf.push_str(&format!(
        "3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] >> endobj\n",
        width, height
    ));
    pdf.push_str("trailer << /Root 1 0 R >>\n%%EOF\n");
    pdf
}

#[async_trait]
impl PdfEngine for MockPdfEngine {
    async fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<()> {
        *self.render_count.lock().unwrap() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = *self.should_fail.lock().unwrap();
        if should_fail {
            return Err(Error::Render("Mock render failure".to_string()));
        }

        tokio::fs::write(output, skeleton_pdf(html, options)).await?;
        Ok(())
    }
}
