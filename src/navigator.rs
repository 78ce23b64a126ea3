use std::sync::Arc;

use crate::api::AnalysisApi;
use crate::models::{BatchOutcome, ResumeAnalysis};

/// Drill-down over a settled batch outcome: open one ranked item by
/// fetching its full record, close to return to the list. Nothing is
/// cached across opens; a failed open never discards the visible list.
pub struct BatchNavigator {
    api: Arc<dyn AnalysisApi>,
    outcome: BatchOutcome,
    open_item: Option<ResumeAnalysis>,
    open_error: Option<String>,
}

impl BatchNavigator {
    pub fn new(api: Arc<dyn AnalysisApi>, outcome: BatchOutcome) -> Self {
        Self {
            api,
            outcome,
            open_item: None,
            open_error: None,
        }
    }

    pub fn outcome(&self) -> &BatchOutcome {
        &self.outcome
    }

    pub fn open_item(&self) -> Option<&ResumeAnalysis> {
        self.open_item.as_ref()
    }

    pub fn open_error(&self) -> Option<&str> {
        self.open_error.as_deref()
    }

    /// Fetch the full record for one ranked item. Always re-fetches.
    pub async fn open(&mut self, resume_id: &str) -> Option<&ResumeAnalysis> {
        match self.api.get_analysis(resume_id).await {
            Ok(analysis) => {
                self.open_item = Some(analysis);
                self.open_error = None;
            }
            Err(err) => {
                self.open_item = None;
                self.open_error = Some(err.to_string());
            }
        }
        self.open_item.as_ref()
    }

    /// Back to the batch list, dropping any open item or error.
    pub fn close(&mut self) {
        self.open_item = None;
        self.open_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ranked, sample_analysis, MockApi};
    use crate::error::CoreError;
    use std::sync::atomic::Ordering;

    fn outcome() -> BatchOutcome {
        BatchOutcome {
            total_processed: 2,
            successful_analyses: 2,
            failed_analyses: 0,
            ranked_resumes: vec![ranked("r1", "a.pdf", 8.0), ranked("r2", "b.pdf", 5.0)],
            failed_files: vec![],
        }
    }

    #[tokio::test]
    async fn open_fetches_full_record() {
        let api = Arc::new(MockApi::new());
        MockApi::script(&api.analysis, Ok(sample_analysis("r1", "Ada")));
        let mut nav = BatchNavigator::new(api.clone(), outcome());

        let analysis = nav.open("r1").await.unwrap();
        assert_eq!(analysis.full_name, "Ada");
        assert!(nav.open_error().is_none());
    }

    #[tokio::test]
    async fn failed_open_keeps_the_list_visible() {
        let api = Arc::new(MockApi::new());
        MockApi::script(
            &api.analysis,
            Err(CoreError::transport("Resume analysis not found.")),
        );
        let mut nav = BatchNavigator::new(api, outcome());

        assert!(nav.open("r2").await.is_none());
        assert_eq!(nav.open_error(), Some("Resume analysis not found."));
        assert_eq!(nav.outcome().ranked_resumes.len(), 2);
    }

    #[tokio::test]
    async fn each_open_refetches() {
        let api = Arc::new(MockApi::new());
        MockApi::script(&api.analysis, Ok(sample_analysis("r1", "Ada")));
        let mut nav = BatchNavigator::new(api.clone(), outcome());

        nav.open("r1").await;
        nav.close();
        nav.open("r1").await;
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_clears_item_and_error() {
        let api = Arc::new(MockApi::new());
        MockApi::script(&api.analysis, Err(CoreError::transport("nope")));
        let mut nav = BatchNavigator::new(api, outcome());

        nav.open("r1").await;
        assert!(nav.open_error().is_some());
        nav.close();
        assert!(nav.open_error().is_none());
        assert!(nav.open_item().is_none());
    }
}
