use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::api::AnalysisApi;
use crate::models::{BatchOutcome, ResumeAnalysis};
use crate::validate::{file_name, rejection_message, validate_files};

#[derive(Debug, Clone)]
pub enum UploadResult {
    Single(ResumeAnalysis),
    Batch(BatchOutcome),
}

/// Exactly one of result/error is ever held: the settled variants carry
/// one or the other, never both.
#[derive(Debug, Clone)]
pub enum UploadState {
    Idle,
    Submitting,
    Succeeded(UploadResult),
    Failed(String),
}

impl UploadState {
    pub fn error(&self) -> Option<&str> {
        match self {
            UploadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Drives one submission cycle: validate, route to the single or batch
/// endpoint, settle. Each submission gets a monotonic sequence number and
/// only the latest issued one may settle the visible state, so a
/// superseded in-flight call can never clobber a newer result.
pub struct Uploader {
    api: Arc<dyn AnalysisApi>,
    state: UploadState,
    seq: u64,
}

impl Uploader {
    pub fn new(api: Arc<dyn AnalysisApi>) -> Self {
        Self {
            api,
            state: UploadState::Idle,
            seq: 0,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Explicit reset back to `Idle`, dropping any held result or error.
    pub fn clear(&mut self) {
        self.state = UploadState::Idle;
    }

    /// Submit a set of resume files. An empty set is a no-op. Validation
    /// runs before any network use; a single file goes to the single
    /// endpoint, more than one to the batch endpoint. Per-file failures
    /// inside a 2xx batch response are data, not a failed submission.
    pub async fn submit(&mut self, files: &[PathBuf]) -> &UploadState {
        if files.is_empty() {
            return &self.state;
        }

        let seq = self.begin();

        if let Err(invalid) = validate_files(files) {
            self.settle(seq, Err(rejection_message(&invalid)));
            return &self.state;
        }

        let result = if files.len() == 1 {
            self.submit_single(&files[0]).await
        } else {
            self.submit_batch(files).await
        };
        self.settle(seq, result);
        &self.state
    }

    async fn submit_single(&self, path: &Path) -> Result<UploadResult, String> {
        let bytes = read_file(path)?;
        self.api
            .analyze_single(&file_name(path), bytes)
            .await
            .map(UploadResult::Single)
            .map_err(|e| e.to_string())
    }

    async fn submit_batch(&self, paths: &[PathBuf]) -> Result<UploadResult, String> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push((file_name(path), read_file(path)?));
        }
        self.api
            .analyze_batch(files)
            .await
            .map(UploadResult::Batch)
            .map_err(|e| e.to_string())
    }

    fn begin(&mut self) -> u64 {
        self.seq += 1;
        self.state = UploadState::Submitting;
        self.seq
    }

    fn settle(&mut self, seq: u64, result: Result<UploadResult, String>) {
        if seq != self.seq {
            debug!(seq, latest = self.seq, "discarding settlement of superseded submission");
            return;
        }
        self.state = match result {
            Ok(result) => UploadState::Succeeded(result),
            Err(message) => UploadState::Failed(message),
        };
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ranked, sample_analysis, MockApi};
    use crate::error::CoreError;
    use crate::models::FailedFile;
    use std::sync::atomic::Ordering;

    fn write_pdfs(dir: &std::path::Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"%PDF-1.4 stub").unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn single_file_goes_to_single_endpoint_once() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(dir.path(), &["ada.pdf"]);
        let api = Arc::new(MockApi::new());
        MockApi::script(&api.single, Ok(sample_analysis("r1", "Ada")));

        let mut uploader = Uploader::new(api.clone());
        uploader.submit(&files).await;

        assert_eq!(api.single_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.batch_calls.load(Ordering::SeqCst), 0);
        match uploader.state() {
            UploadState::Succeeded(UploadResult::Single(analysis)) => {
                assert_eq!(analysis.resume_id, "r1");
            }
            other => panic!("expected single success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_files_go_to_batch_endpoint_once() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]);
        let api = Arc::new(MockApi::new());
        MockApi::script(
            &api.batch,
            Ok(BatchOutcome {
                total_processed: 3,
                successful_analyses: 3,
                failed_analyses: 0,
                ranked_resumes: vec![
                    ranked("r1", "a.pdf", 9.0),
                    ranked("r2", "b.pdf", 7.0),
                    ranked("r3", "c.pdf", 4.0),
                ],
                failed_files: vec![],
            }),
        );

        let mut uploader = Uploader::new(api.clone());
        uploader.submit(&files).await;

        assert_eq!(api.single_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.batch_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            uploader.state(),
            UploadState::Succeeded(UploadResult::Batch(_))
        ));
    }

    #[tokio::test]
    async fn empty_set_calls_nothing_and_keeps_state() {
        let api = Arc::new(MockApi::new());
        let mut uploader = Uploader::new(api.clone());
        uploader.submit(&[]).await;

        assert_eq!(api.single_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.batch_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(uploader.state(), UploadState::Idle));
    }

    #[tokio::test]
    async fn invalid_extension_fails_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = write_pdfs(dir.path(), &["ok.pdf"]);
        let bad = dir.path().join("notes.txt");
        std::fs::write(&bad, b"plain text").unwrap();
        files.push(bad);

        let api = Arc::new(MockApi::new());
        let mut uploader = Uploader::new(api.clone());
        uploader.submit(&files).await;

        assert_eq!(api.single_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.batch_calls.load(Ordering::SeqCst), 0);
        let error = uploader.state().error().unwrap();
        assert!(error.contains("notes.txt"), "offending name surfaced: {error}");
    }

    #[tokio::test]
    async fn transport_failure_surfaces_service_message() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(dir.path(), &["ada.pdf"]);
        let api = Arc::new(MockApi::new());
        MockApi::script(
            &api.single,
            Err(CoreError::transport("AI analysis failed")),
        );

        let mut uploader = Uploader::new(api);
        uploader.submit(&files).await;

        assert_eq!(uploader.state().error(), Some("AI analysis failed"));
    }

    #[tokio::test]
    async fn partial_batch_failure_is_still_a_success() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(
            dir.path(),
            &["a.pdf", "b.pdf", "corrupt.pdf", "d.pdf", "e.pdf"],
        );
        let api = Arc::new(MockApi::new());
        MockApi::script(
            &api.batch,
            Ok(BatchOutcome {
                total_processed: 5,
                successful_analyses: 4,
                failed_analyses: 1,
                ranked_resumes: vec![
                    ranked("r1", "a.pdf", 9.1),
                    ranked("r2", "d.pdf", 8.0),
                    ranked("r3", "b.pdf", 6.5),
                    ranked("r4", "e.pdf", 3.2),
                ],
                failed_files: vec![FailedFile {
                    filename: "corrupt.pdf".to_string(),
                    error: "text extraction failed".to_string(),
                    resume_id: None,
                }],
            }),
        );

        let mut uploader = Uploader::new(api);
        uploader.submit(&files).await;

        let UploadState::Succeeded(UploadResult::Batch(outcome)) = uploader.state() else {
            panic!("partial failure must settle as success");
        };
        assert_eq!(
            outcome.successful_analyses + outcome.failed_analyses,
            outcome.total_processed
        );
        assert_eq!(outcome.ranked_resumes.len(), outcome.successful_analyses);
        assert_eq!(outcome.failed_files.len(), outcome.failed_analyses);
        assert_eq!(outcome.failed_files[0].filename, "corrupt.pdf");
        // server order preserved: descending fit score
        let scores: Vec<f64> = outcome.ranked_resumes.iter().map(|r| r.fit_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn success_replaces_prior_error_and_vice_versa() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(dir.path(), &["ada.pdf"]);
        let api = Arc::new(MockApi::new());
        let mut uploader = Uploader::new(api.clone());

        MockApi::script(&api.single, Err(CoreError::transport("first failure")));
        uploader.submit(&files).await;
        assert!(uploader.state().error().is_some());

        MockApi::script(&api.single, Ok(sample_analysis("r1", "Ada")));
        uploader.submit(&files).await;
        assert!(matches!(uploader.state(), UploadState::Succeeded(_)));
        assert!(uploader.state().error().is_none());
    }

    #[tokio::test]
    async fn stale_settlement_is_discarded() {
        let api = Arc::new(MockApi::new());
        let mut uploader = Uploader::new(api);

        let stale = uploader.begin();
        let latest = uploader.begin();
        assert!(latest > stale);

        uploader.settle(stale, Err("slow loser".to_string()));
        assert!(
            matches!(uploader.state(), UploadState::Submitting),
            "stale settlement must not clobber the newer cycle"
        );

        uploader.settle(
            latest,
            Ok(UploadResult::Single(sample_analysis("r9", "Nia"))),
        );
        assert!(matches!(uploader.state(), UploadState::Succeeded(_)));
    }

    #[tokio::test]
    async fn clear_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_pdfs(dir.path(), &["ada.pdf"]);
        let api = Arc::new(MockApi::new());
        MockApi::script(&api.single, Ok(sample_analysis("r1", "Ada")));

        let mut uploader = Uploader::new(api);
        uploader.submit(&files).await;
        uploader.clear();
        assert!(matches!(uploader.state(), UploadState::Idle));
    }
}
