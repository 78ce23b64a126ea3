use std::sync::Arc;
use tracing::warn;

use crate::api::{AnalysisApi, ExportPayload};
use crate::error::CoreError;
use crate::models::{
    AggregateMetrics, CandidatePage, DashboardSummary, SkillsAnalysis, TimeRange,
};

/// Page size and skill count mirror what the dashboard view requests.
const CANDIDATE_PAGE_SIZE: u64 = 50;
const TOP_SKILLS: u64 = 10;

/// One dashboard fetch. Whatever subset of the four sub-queries
/// succeeded is populated; the names of the ones that failed are listed
/// instead of failing the whole snapshot.
#[derive(Debug)]
pub struct AnalyticsSnapshot {
    pub metrics: Option<AggregateMetrics>,
    pub candidates: Option<CandidatePage>,
    pub dashboard: Option<DashboardSummary>,
    pub skills: Option<SkillsAnalysis>,
    pub failed: Vec<&'static str>,
}

impl AnalyticsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none()
            && self.candidates.is_none()
            && self.dashboard.is_none()
            && self.skills.is_none()
    }
}

pub struct AnalyticsAggregator {
    api: Arc<dyn AnalysisApi>,
}

impl AnalyticsAggregator {
    pub fn new(api: Arc<dyn AnalysisApi>) -> Self {
        Self { api }
    }

    /// Issue the four read queries together and merge whatever comes
    /// back. Their completions are independent; no ordering is implied.
    pub async fn load_snapshot(&self, range: TimeRange) -> AnalyticsSnapshot {
        let (metrics, candidates, dashboard, skills) = tokio::join!(
            self.api.analytics_metrics(range),
            self.api
                .analytics_candidates(range, CANDIDATE_PAGE_SIZE, 0, "fit_score", "desc"),
            self.api.analytics_dashboard(range),
            self.api.analytics_skills(range, TOP_SKILLS),
        );

        let mut failed = Vec::new();
        let metrics = keep("metrics", metrics, &mut failed);
        let candidates = keep("candidates", candidates, &mut failed);
        let dashboard = keep("dashboard", dashboard, &mut failed);
        let skills = keep("skills", skills, &mut failed);

        AnalyticsSnapshot {
            metrics,
            candidates,
            dashboard,
            skills,
            failed,
        }
    }

    /// One-shot export query; the payload is handed to the file-save
    /// collaborator unchanged.
    pub async fn export(
        &self,
        range: TimeRange,
        format: &str,
    ) -> Result<ExportPayload, CoreError> {
        self.api.analytics_export(range, format).await
    }
}

fn keep<T>(
    name: &'static str,
    result: Result<T, CoreError>,
    failed: &mut Vec<&'static str>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("analytics query {name} failed: {err}");
            failed.push(name);
            None
        }
    }
}

/// Render the export payload the way the file-save collaborator expects
/// it: pretty JSON, or the raw CSV text the service produced.
pub fn export_file_contents(payload: &ExportPayload) -> Result<String, CoreError> {
    if payload.format.eq_ignore_ascii_case("csv") {
        payload
            .data
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CoreError::transport("CSV export payload was not text"))
    } else {
        serde_json::to_string_pretty(&payload.data)
            .map_err(|e| CoreError::transport(format!("Failed to encode export: {e}")))
    }
}
