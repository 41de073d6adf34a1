use super::{with_page_style, PdfEngine, PdfOptions};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// How long Chromium lets the page load and settle before printing.
const DEFAULT_SETTLE_BUDGET: Duration = Duration::from_secs(5);

/// A running headless browser. Dropping the session kills the process, so
/// every exit path (errors, timeouts, cancelled futures) tears it down.
pub struct BrowserSession {
    child: Option<Child>,
}

impl BrowserSession {
    pub fn launch(program: &str, args: &[String]) -> Result<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Render(format!("Failed to launch {}: {}", program, e)))?;

        tracing::debug!("Launched headless browser (pid {:?})", child.id());
        Ok(Self { child: Some(child) })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    /// Wait for the browser to exit on its own, collecting stderr.
    pub async fn wait(&mut self) -> Result<(ExitStatus, String)> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| Error::Render("Browser session already closed".to_string()))?;

        let mut stderr = child.stderr.take();
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf
        };

        let (status, stderr) = tokio::join!(child.wait(), read_stderr);
        let status =
            status.map_err(|e| Error::Render(format!("Failed waiting for browser: {}", e)))?;

        self.child = None;
        Ok((status, String::from_utf8_lossy(&stderr).into_owned()))
    }

    /// Kill the browser if it is still running and reap it.
    pub async fn close(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill headless browser: {}", e);
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            tracing::debug!("Killing headless browser (pid {:?}) on drop", child.id());
            let _ = child.start_kill();
        }
    }
}

pub struct ChromiumEngine {
    chromium_path: String,
    settle_budget: Duration,
}

impl ChromiumEngine {
    pub fn new(chromium_path: String) -> Self {
        Self {
            chromium_path,
            settle_budget: DEFAULT_SETTLE_BUDGET,
        }
    }

    pub fn with_settle_budget(mut self, settle_budget: Duration) -> Self {
        self.settle_budget = settle_budget;
        self
    }

    fn args(&self, page: &Path, profile: &Path, output: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-first-run".to_string(),
            "--hide-scrollbars".to_string(),
            "--no-pdf-header-footer".to_string(),
            "--run-all-compositor-stages-before-draw".to_string(),
            format!("--virtual-time-budget={}", self.settle_budget.as_millis()),
            format!("--user-data-dir={}", profile.display()),
            format!("--print-to-pdf={}", output.display()),
            format!("file://{}", page.display()),
        ]
    }
}

#[async_trait]
impl PdfEngine for ChromiumEngine {
    async fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<()> {
        let page_file = tempfile::Builder::new()
            .prefix("certificate-")
            .suffix(".html")
            .tempfile()?;
        tokio::fs::write(page_file.path(), with_page_style(html, options)).await?;

        // Separate profile per render so concurrent browsers never share a lock
        let profile = tempfile::tempdir()?;

        let args = self.args(page_file.path(), profile.path(), output);
        let mut session = BrowserSession::launch(&self.chromium_path, &args)?;
        let (status, stderr) = session.wait().await?;
        session.close().await;

        if !status.success() {
            return Err(Error::Render(format!(
                "Headless browser exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(metadata) if metadata.len() > 0 => {
                tracing::debug!(
                    "Rendered {} ({} bytes)",
                    output.display(),
                    metadata.len()
                );
                Ok(())
            }
            _ => Err(Error::Render(format!(
                "Headless browser produced no PDF at {}",
                output.display()
            ))),
        }
    }
}
