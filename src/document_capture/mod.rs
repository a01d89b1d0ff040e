//! Sequential export of pages to paginated documents
//!
//! Each URL gets its own isolated page (through the [`DocumentRenderer`]),
//! which is torn down before the next one starts. A fixed delay separates
//! captures. One URL failing never stops the batch.

pub mod types;

pub use types::{CaptureError, CaptureRecord, CaptureRequest, CaptureResult};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use url::Url;

use crate::config::CaptureConfig;
use crate::renderer::{CaptureRenderOptions, DocumentRenderer};
use crate::utils::parse_target_url;

/// Longest file stem derived from a URL, before the index prefix
const MAX_STEM_LEN: usize = 120;

/// File name for the `index`th capture: `003-example.org-bell-schedule.pdf`
pub fn capture_filename(index: usize, url: &Url) -> String {
    let host = url.host_str().unwrap_or("page");
    let path: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let mut stem = if path.is_empty() {
        host.to_string()
    } else {
        format!("{host}-{}", path.join("-"))
    };
    if let Some(query) = url.query() {
        stem.push('-');
        stem.push_str(query);
    }
    if stem.len() > MAX_STEM_LEN {
        let mut cut = MAX_STEM_LEN;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
    }

    let stem = stem.trim_end_matches(".pdf").replace(['=', '&', '?'], "_");
    sanitize_filename::sanitize(format!("{index:03}-{stem}.pdf"))
}

/// Captures a batch of URLs one at a time
pub struct DocumentCapturer<R> {
    renderer: R,
    config: CaptureConfig,
}

impl<R: DocumentRenderer> DocumentCapturer<R> {
    pub fn new(renderer: R, config: CaptureConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture every URL in order; per-URL failures are recorded, not returned
    pub async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResult, CaptureError> {
        if request.urls.is_empty() {
            return Err(CaptureError::NoTargets);
        }
        let targets = request
            .urls
            .iter()
            .map(|u| parse_target_url(u).map_err(|e| CaptureError::InvalidUrl(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output_dir.clone());
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| CaptureError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        let options = CaptureRenderOptions {
            timeout: self.config.navigation_timeout(),
            document: request.document.clone().unwrap_or_default(),
        };

        info!(count = targets.len(), dir = %output_dir.display(), "Starting document capture");
        let started = Instant::now();
        let mut records = Vec::with_capacity(targets.len());

        for (index, (requested, target)) in request.urls.iter().zip(&targets).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.capture_delay()).await;
            }
            let record = self
                .capture_one(index + 1, requested, target, &output_dir, &options)
                .await;
            records.push(record);
        }

        let result = CaptureResult {
            captured: records.iter().filter(|r| r.success).count(),
            failed: records.iter().filter(|r| !r.success).count(),
            modals_dismissed: records.iter().filter(|r| r.modals_dismissed).count(),
            total_bytes: records.iter().map(|r| r.bytes).sum(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            output_dir,
            records,
        };
        info!(
            captured = result.captured,
            failed = result.failed,
            bytes = result.total_bytes,
            "Document capture finished"
        );
        Ok(result)
    }

    async fn capture_one(
        &self,
        index: usize,
        requested: &str,
        target: &Url,
        output_dir: &Path,
        options: &CaptureRenderOptions,
    ) -> CaptureRecord {
        let mut record = CaptureRecord {
            url: requested.to_string(),
            ..CaptureRecord::default()
        };

        let document = match self.renderer.capture(target.as_str(), options).await {
            Ok(document) => document,
            Err(e) => {
                warn!(url = %target, error = %e, "Capture failed");
                record.error = Some(e.to_string());
                return record;
            }
        };
        record.title = document.title;
        record.modals_dismissed = document.overlay_dismissed;

        if document.bytes.is_empty() {
            warn!(url = %target, "Engine produced an empty document");
            record.error = Some("engine produced an empty document".to_string());
            return record;
        }

        let path: PathBuf = output_dir.join(capture_filename(index, target));
        match tokio::fs::write(&path, &document.bytes).await {
            Ok(()) => {
                info!(
                    url = %target,
                    path = %path.display(),
                    bytes = document.bytes.len(),
                    overlay_dismissed = record.modals_dismissed,
                    "Captured document"
                );
                record.success = true;
                record.bytes = document.bytes.len() as u64;
                record.output_path = Some(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write document");
                record.error = Some(format!("failed to write {}: {e}", path.display()));
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{CapturedDocument, DocumentOptions, PageFormat, RenderError};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed document per URL and remembers the call order and options
    #[derive(Default)]
    struct FakeCapture {
        calls: Mutex<Vec<(String, PageFormat, tokio::time::Instant)>>,
    }

    impl DocumentRenderer for FakeCapture {
        async fn capture(
            &self,
            url: &str,
            options: &CaptureRenderOptions,
        ) -> Result<CapturedDocument, RenderError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), options.document.format, tokio::time::Instant::now()));
            if url.contains("down") {
                return Err(RenderError::Navigation("net::ERR_CONNECTION_REFUSED".into()));
            }
            if url.contains("blank") {
                return Ok(CapturedDocument::default());
            }
            Ok(CapturedDocument {
                bytes: b"%PDF-1.4 fake".to_vec(),
                title: Some(format!("Title of {url}")),
                overlay_dismissed: url.contains("consent"),
            })
        }
    }

    fn config(delay_ms: u64) -> CaptureConfig {
        CaptureConfig {
            capture_delay_ms: delay_ms,
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_capture_filename() {
        let url = Url::parse("https://example.org/schools/bell-schedule/").unwrap();
        assert_eq!(capture_filename(3, &url), "003-example.org-schools-bell-schedule.pdf");

        let root = Url::parse("https://example.org/").unwrap();
        assert_eq!(capture_filename(1, &root), "001-example.org.pdf");

        let query = Url::parse("https://example.org/page.php?id=7&x=y").unwrap();
        assert_eq!(capture_filename(2, &query), "002-example.org-page.php-id_7_x_y.pdf");

        let long = Url::parse(&format!("https://example.org/{}", "a".repeat(400))).unwrap();
        assert!(capture_filename(1, &long).len() <= MAX_STEM_LEN + 8);
    }

    #[tokio::test]
    async fn test_batch_records_every_url_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = DocumentCapturer::new(FakeCapture::default(), config(0));
        let request = CaptureRequest::new([
            "https://example.org/consent",
            "https://down.example.org/",
            "https://example.org/blank",
            "https://example.org/plain",
        ])
        .with_output_dir(dir.path());

        let result = capturer.capture(&request).await.unwrap();

        assert_eq!(result.records.len(), 4);
        assert_eq!(result.captured, 2);
        assert_eq!(result.failed, 2);
        assert_eq!(result.modals_dismissed, 1);

        let first = &result.records[0];
        assert!(first.success);
        assert!(first.modals_dismissed);
        assert_eq!(first.bytes, 13);
        let path = first.output_path.as_ref().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4 fake");
        assert!(path.starts_with(dir.path()));

        assert!(!result.records[1].success);
        assert!(result.records[1].error.as_deref().unwrap().contains("CONNECTION_REFUSED"));
        assert!(result.records[2].error.as_deref().unwrap().contains("empty"));
        assert_eq!(result.total_bytes, 26);
    }

    #[tokio::test]
    async fn test_document_options_reach_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = DocumentCapturer::new(FakeCapture::default(), config(0));
        let document = DocumentOptions {
            format: PageFormat::A4,
            ..DocumentOptions::default()
        };
        let request = CaptureRequest::new(["https://example.org/"])
            .with_output_dir(dir.path().join("nested/out"))
            .with_document(document);

        let result = capturer.capture(&request).await.unwrap();

        assert!(result.records[0].success);
        assert!(dir.path().join("nested/out").is_dir());
        assert_eq!(capturer.renderer.calls.lock().unwrap()[0].1, PageFormat::A4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_captures() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = DocumentCapturer::new(FakeCapture::default(), config(1_000));
        let request = CaptureRequest::new(["https://example.org/a", "https://example.org/b"])
            .with_output_dir(dir.path());

        capturer.capture(&request).await.unwrap();

        let calls = capturer.renderer.calls.lock().unwrap();
        assert!(calls[1].2 - calls[0].2 >= Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_invalid_input_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let capturer = DocumentCapturer::new(FakeCapture::default(), config(0));

        let err = capturer
            .capture(&CaptureRequest::new(["https://example.org/", "javascript:alert(1)"]).with_output_dir(&out))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidUrl(_)));

        let err = capturer
            .capture(&CaptureRequest::new(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NoTargets));

        assert!(!out.exists());
        assert!(capturer.renderer.calls.lock().unwrap().is_empty());
    }
}
