//! Certificate issuance
//!
//! Fills the certificate HTML template with learner and course fields and
//! prints it to a fixed-size PDF named after the certificate id.

pub mod collision;
pub mod template;

pub use collision::{certificate_file_name, CollisionPolicy};
pub use template::render_template;

use crate::models::{CertificateConfig, CertificateDocument, CertificateRequest};
use crate::pdf::{PdfEngine, PdfOptions};
use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Generate a fresh certificate id such as `CERT-3F2A...`.
pub fn new_certificate_id() -> String {
    format!("CERT-{}", Uuid::new_v4().simple()).to_uppercase()
}

/// Ids end up in a file name and a URL, so only a conservative character set
/// is accepted.
fn validate_request(request: &CertificateRequest) -> Result<()> {
    let id = request.certificate_id.as_str();
    if id.is_empty() {
        return Err(Error::Input("missing certificate id".to_string()));
    }
    if id.starts_with('.')
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::Input(format!("invalid certificate id '{}'", id)));
    }
    Ok(())
}

pub struct CertificateRenderer {
    engine: Box<dyn PdfEngine>,
    template_path: PathBuf,
    output_dir: PathBuf,
    verify_base_url: String,
    render_timeout: Duration,
    collision_policy: CollisionPolicy,
    pdf_options: PdfOptions,
}

impl CertificateRenderer {
    pub fn new(config: &CertificateConfig, engine: Box<dyn PdfEngine>) -> Self {
        Self {
            engine,
            template_path: config.template_path.clone(),
            output_dir: config.output_dir.clone(),
            verify_base_url: config.verify_base_url.clone(),
            render_timeout: config.render_timeout,
            collision_policy: config.collision_policy,
            pdf_options: PdfOptions::default(),
        }
    }

    pub fn with_collision_policy(mut self, collision_policy: CollisionPolicy) -> Self {
        self.collision_policy = collision_policy;
        self
    }

    pub fn with_render_timeout(mut self, render_timeout: Duration) -> Self {
        self.render_timeout = render_timeout;
        self
    }

    async fn load_template(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| Error::Template {
                path: self.template_path.clone(),
                source,
            })
    }

    fn substitute(&self, template: &str, request: &CertificateRequest) -> String {
        let fields = template::certificate_fields(request, &self.verify_base_url);
        let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let html = render_template(template, &pairs);

        let leftover = template::unresolved_placeholders(&html);
        if !leftover.is_empty() {
            warn!(
                "Certificate template {} left placeholders unresolved: {:?}",
                self.template_path.display(),
                leftover
            );
        }
        html
    }

    /// Certificate markup only, without printing a PDF.
    pub async fn render_html(&self, request: &CertificateRequest) -> Result<String> {
        validate_request(request)?;
        let template = self.load_template().await?;
        Ok(self.substitute(&template, request))
    }

    /// Render the certificate PDF and return where it was written.
    ///
    /// The engine prints into a scratch file next to the target, which only
    /// replaces `certificate-<id>.pdf` once a non-empty PDF came back. With
    /// [`CollisionPolicy::Overwrite`] a second request for the same id
    /// replaces the first file; the caller owns the file afterwards.
    pub async fn generate_pdf(&self, request: &CertificateRequest) -> Result<CertificateDocument> {
        let html = self.render_html(request).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await?;

        let slot =
            collision::reserve_output(&output_dir, &request.certificate_id, self.collision_policy)?;
        let scratch = tempfile::Builder::new()
            .prefix(".certificate-")
            .suffix(".pdf")
            .tempfile_in(&output_dir)?
            .into_temp_path();

        let rendered = tokio::time::timeout(
            self.render_timeout,
            self.engine.render(&html, &scratch, &self.pdf_options),
        )
        .await
        .unwrap_or(Err(Error::RenderTimeout(self.render_timeout)));

        let rendered = match rendered {
            Ok(()) => match tokio::fs::metadata(&scratch).await {
                Ok(metadata) if metadata.len() > 0 => Ok(()),
                _ => Err(Error::Render(format!(
                    "PDF engine wrote nothing for certificate {}",
                    request.certificate_id
                ))),
            },
            Err(e) => Err(e),
        };

        // Dropping `scratch` and `slot` removes the scratch file and any placeholder
        if let Err(e) = rendered {
            warn!(
                "Certificate {} failed to render: {}",
                request.certificate_id, e
            );
            return Err(e);
        }

        scratch.persist(&slot.path).map_err(|e| Error::Io(e.error))?;
        let path = slot.commit();

        info!(
            "Generated certificate {} at {}",
            request.certificate_id,
            path.display()
        );

        Ok(CertificateDocument {
            certificate_id: request.certificate_id.clone(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::MockPdfEngine;
    use crate::ErrorKind;
    use std::path::Path;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<html><head></head><body>{{STUDENT_NAME}} | {{COURSE_TITLE}} | \
        {{CERTIFICATE_ID}} | {{VERIFY_URL}}</body></html>";

    struct TestRenderer {
        renderer: CertificateRenderer,
        output_dir: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestRenderer {
        fn new(engine: MockPdfEngine) -> Self {
            Self::with_engine(Box::new(engine))
        }

        fn with_engine(engine: Box<dyn PdfEngine>) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let template_path = temp_dir.path().join("certificate.html");
            std::fs::write(&template_path, TEMPLATE).unwrap();
            let output_dir = temp_dir.path().join("out");

            let config = CertificateConfig {
                template_path,
                output_dir: output_dir.clone(),
                verify_base_url: "https://lms.test/verify/".to_string(),
                ..CertificateConfig::default()
            };

            Self {
                renderer: CertificateRenderer::new(&config, engine),
                output_dir,
                _temp_dir: temp_dir,
            }
        }
    }

    fn request(name: &str, id: &str) -> CertificateRequest {
        CertificateRequest::new(name.to_string(), "Intro to Algorithms".to_string(), id.to_string())
    }

    fn output_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_generate_pdf_writes_named_file() {
        let engine = MockPdfEngine::new();
        let test = TestRenderer::new(engine.clone());

        let doc = test
            .renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-001"))
            .await
            .unwrap();

        assert!(doc.path.is_absolute());
        assert!(doc.path.ends_with("certificate-CERT-001.pdf"));
        assert!(test.output_dir.is_dir());

        let pdf = std::fs::read_to_string(&doc.path).unwrap();
        assert!(pdf.contains("Ada Lovelace"));
        assert!(pdf.contains("https://lms.test/verify/CERT-001"));
        assert_eq!(engine.get_render_count(), 1);
    }

    #[tokio::test]
    async fn test_same_id_last_write_wins() {
        let test = TestRenderer::new(MockPdfEngine::new());

        let first = test
            .renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-002"))
            .await
            .unwrap();
        let second = test
            .renderer
            .generate_pdf(&request("Grace Hopper", "CERT-002"))
            .await
            .unwrap();

        assert_eq!(first.path, second.path);
        let pdf = std::fs::read_to_string(&second.path).unwrap();
        assert!(pdf.contains("Grace Hopper"));
        assert!(!pdf.contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_reissue() {
        let test = TestRenderer::new(MockPdfEngine::new());
        let renderer = test.renderer.with_collision_policy(CollisionPolicy::Reject);

        renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-003"))
            .await
            .unwrap();
        let err = renderer
            .generate_pdf(&request("Grace Hopper", "CERT-003"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_render_html_without_pdf() {
        let engine = MockPdfEngine::new();
        let test = TestRenderer::new(engine.clone());

        let html = test
            .renderer
            .render_html(&request("Ada Lovelace", "CERT-004"))
            .await
            .unwrap();

        assert!(html.contains("Ada Lovelace | Intro to Algorithms | CERT-004"));
        assert!(template::unresolved_placeholders(&html).is_empty());
        assert_eq!(engine.get_render_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_template_is_template_error() {
        let config = CertificateConfig {
            template_path: PathBuf::from("/nonexistent/certificate.html"),
            ..CertificateConfig::default()
        };
        let engine = MockPdfEngine::new();
        let renderer = CertificateRenderer::new(&config, Box::new(engine.clone()));

        let err = renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-005"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Template);
        assert_eq!(engine.get_render_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected_before_io() {
        let engine = MockPdfEngine::new();
        let test = TestRenderer::new(engine.clone());

        for id in ["", "../escape", "a/b", ".hidden", "CERT 1"] {
            let err = test
                .renderer
                .generate_pdf(&request("Ada Lovelace", id))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input, "id {:?}", id);
        }
        assert_eq!(engine.get_render_count(), 0);
    }

    #[tokio::test]
    async fn test_render_failure_releases_reserved_path() {
        let test = TestRenderer::new(MockPdfEngine::new().with_failure(true));
        let renderer = test.renderer.with_collision_policy(CollisionPolicy::Reject);

        let err = renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-006"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(!test.output_dir.join("certificate-CERT-006.pdf").exists());
    }

    #[tokio::test]
    async fn test_hung_render_times_out() {
        let test = TestRenderer::new(MockPdfEngine::new().with_delay(Duration::from_secs(30)));
        let renderer = test
            .renderer
            .with_render_timeout(Duration::from_millis(50));

        let err = renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-007"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RenderTimeout(_)));
        assert!(!test.output_dir.join("certificate-CERT-007.pdf").exists());
    }

    #[tokio::test]
    async fn test_cancelled_render_frees_reserved_id() {
        let test = TestRenderer::new(MockPdfEngine::new().with_delay(Duration::from_secs(30)));
        let renderer = test.renderer.with_collision_policy(CollisionPolicy::Reject);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(100),
            renderer.generate_pdf(&request("Ada Lovelace", "CERT-009")),
        )
        .await;

        assert!(cancelled.is_err());
        assert!(output_files(&test.output_dir).is_empty());
        collision::reserve_output(&test.output_dir, "CERT-009", CollisionPolicy::Reject).unwrap();
    }

    #[tokio::test]
    async fn test_empty_engine_output_is_render_error() {
        struct SilentEngine;

        #[async_trait::async_trait]
        impl PdfEngine for SilentEngine {
            async fn render(
                &self,
                _html: &str,
                _output: &Path,
                _options: &PdfOptions,
            ) -> Result<()> {
                Ok(())
            }
        }

        let test = TestRenderer::with_engine(Box::new(SilentEngine));

        let err = test
            .renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-010"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(output_files(&test.output_dir).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_browser_without_output_keeps_previous_certificate() {
        use crate::pdf::ChromiumEngine;

        let test = TestRenderer::with_engine(Box::new(ChromiumEngine::new("true".to_string())));
        std::fs::create_dir_all(&test.output_dir).unwrap();
        let existing = test.output_dir.join("certificate-CERT-1.pdf");
        std::fs::write(&existing, "%PDF-1.4 Ada Lovelace (old issue)").unwrap();

        let err = test
            .renderer
            .generate_pdf(&request("Grace Hopper", "CERT-1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(
            std::fs::read_to_string(&existing).unwrap(),
            "%PDF-1.4 Ada Lovelace (old issue)"
        );
        assert_eq!(output_files(&test.output_dir), vec!["certificate-CERT-1.pdf"]);
    }

    /// Gone from /proc, or a zombie waiting to be reaped.
    #[cfg(target_os = "linux")]
    async fn wait_for_exit(pid: u32) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Err(_) => return true,
                Ok(stat) => {
                    let state = stat
                        .rsplit(')')
                        .next()
                        .and_then(|rest| rest.trim().chars().next());
                    if state == Some('Z') {
                        return true;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_render_timeout_kills_browser() {
        use crate::pdf::ChromiumEngine;
        use std::os::unix::fs::PermissionsExt;

        let scripts = TempDir::new().unwrap();
        let pid_file = scripts.path().join("browser.pid");
        let browser = scripts.path().join("slow-browser");
        std::fs::write(
            &browser,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&browser, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = ChromiumEngine::new(browser.to_string_lossy().into_owned());
        let test = TestRenderer::with_engine(Box::new(engine));
        let renderer = test
            .renderer
            .with_render_timeout(Duration::from_secs(1));

        let err = renderer
            .generate_pdf(&request("Ada Lovelace", "CERT-011"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RenderTimeout(_)));

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_for_exit(pid).await, "browser {} still running", pid);
        assert!(output_files(&test.output_dir).is_empty());
    }

    #[test]
    fn test_new_certificate_id_shape() {
        let id = new_certificate_id();
        assert!(id.starts_with("CERT-"));
        assert_eq!(id.len(), "CERT-".len() + 32);
        assert_ne!(id, new_certificate_id());
    }
}
