use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::CoreError;
use crate::models::{
    AckResponse, AggregateMetrics, BatchOutcome, CandidatePage, DashboardSummary,
    ProviderConfigResponse, ProviderUpdate, ResumeAnalysis, SkillsAnalysis, TimeRange,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Read result for the stored job description. A 404 from the service
/// means "none saved yet" and is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobDescription {
    Found(String),
    NotFound,
}

/// Everything the orchestration layer needs from the analysis service.
/// Object-safe so tests can script a fake behind the same seam.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn analyze_single(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ResumeAnalysis, CoreError>;

    async fn analyze_batch(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<BatchOutcome, CoreError>;

    async fn get_analysis(&self, resume_id: &str) -> Result<ResumeAnalysis, CoreError>;

    async fn get_job_description(&self) -> Result<RemoteJobDescription, CoreError>;
    async fn save_job_description(&self, text: &str) -> Result<(), CoreError>;

    async fn get_llm_config(&self) -> Result<ProviderConfigResponse, CoreError>;
    async fn update_llm_config(&self, update: &ProviderUpdate) -> Result<AckResponse, CoreError>;
    async fn get_provider_models(&self, provider: &str) -> Result<Vec<String>, CoreError>;
    async fn reset_llm_config(&self) -> Result<AckResponse, CoreError>;

    async fn analytics_metrics(&self, range: TimeRange) -> Result<AggregateMetrics, CoreError>;
    async fn analytics_candidates(
        &self,
        range: TimeRange,
        limit: u64,
        offset: u64,
        sort_by: &str,
        sort_order: &str,
    ) -> Result<CandidatePage, CoreError>;
    async fn analytics_dashboard(&self, range: TimeRange) -> Result<DashboardSummary, CoreError>;
    async fn analytics_skills(
        &self,
        range: TimeRange,
        top_n: u64,
    ) -> Result<SkillsAnalysis, CoreError>;
    async fn analytics_export(
        &self,
        range: TimeRange,
        format: &str,
    ) -> Result<ExportPayload, CoreError>;
}

/// Envelope the analytics endpoints wrap their payloads in. The `data`
/// default is spelled out so the derive does not demand `T: Default` of
/// every payload type.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, CoreError> {
        if !self.success {
            return Err(CoreError::transport(
                self.message.unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| CoreError::transport("Response contained no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct JobDescriptionResponse {
    #[allow(dead_code)]
    #[serde(default)]
    success: bool,
    #[serde(default)]
    job_description: String,
}

/// Export result handed off unchanged to the file-save collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportPayload {
    #[serde(default)]
    pub format: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub record_count: u64,
}

pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        expect_json(response).await
    }
}

/// Pull the service's own error text out of a failure body; the backend
/// reports either {"error": ...} or {"detail": ...}.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let reason = status.canonical_reason().unwrap_or("request failed");
    format!("HTTP {}: {}", status.as_u16(), reason)
}

fn transport_error(err: reqwest::Error) -> CoreError {
    CoreError::transport(format!("Failed to reach analysis service: {err}"))
}

async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CoreError::transport(error_message(status, &body)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| CoreError::transport(format!("Failed to parse service response: {e}")))
}

fn pdf_part(filename: &str, bytes: Vec<u8>) -> Result<Part, CoreError> {
    Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("application/pdf")
        .map_err(|e| CoreError::transport(format!("Failed to encode upload: {e}")))
}

#[async_trait]
impl AnalysisApi for HttpApi {
    async fn analyze_single(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ResumeAnalysis, CoreError> {
        debug!(filename, "POST /api/upload-resume/");
        let form = Form::new().part("file", pdf_part(filename, bytes)?);
        let response = self
            .client
            .post(self.url("/api/upload-resume/"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        expect_json(response).await
    }

    async fn analyze_batch(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<BatchOutcome, CoreError> {
        debug!(count = files.len(), "POST /api/upload-resume-batch/");
        let mut form = Form::new();
        for (filename, bytes) in files {
            form = form.part("files", pdf_part(&filename, bytes)?);
        }
        let response = self
            .client
            .post(self.url("/api/upload-resume-batch/"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        expect_json(response).await
    }

    async fn get_analysis(&self, resume_id: &str) -> Result<ResumeAnalysis, CoreError> {
        self.get_json(&format!("/api/get-analysis/{resume_id}"), &[]).await
    }

    async fn get_job_description(&self) -> Result<RemoteJobDescription, CoreError> {
        debug!("GET /api/get-job-description/");
        let response = self
            .client
            .get(self.url("/api/get-job-description/"))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 is the "nothing saved yet" outcome, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RemoteJobDescription::NotFound);
        }
        let body: JobDescriptionResponse = expect_json(response).await?;
        Ok(RemoteJobDescription::Found(body.job_description))
    }

    async fn save_job_description(&self, text: &str) -> Result<(), CoreError> {
        debug!("POST /api/save-job-description/");
        let response = self
            .client
            .post(self.url("/api/save-job-description/"))
            .json(&serde_json::json!({ "job_description": text }))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::transport(error_message(status, &body)));
        }
        Ok(())
    }

    async fn get_llm_config(&self) -> Result<ProviderConfigResponse, CoreError> {
        self.get_json("/api/llm/config", &[]).await
    }

    async fn update_llm_config(&self, update: &ProviderUpdate) -> Result<AckResponse, CoreError> {
        debug!(provider = %update.provider, model = %update.model, "POST /api/llm/config");
        let response = self
            .client
            .post(self.url("/api/llm/config"))
            .json(update)
            .send()
            .await
            .map_err(transport_error)?;
        expect_json(response).await
    }

    async fn get_provider_models(&self, provider: &str) -> Result<Vec<String>, CoreError> {
        #[derive(Deserialize)]
        struct ModelsResponse {
            #[serde(default)]
            models: Vec<String>,
        }
        let body: ModelsResponse = self
            .get_json(&format!("/api/llm/models/{provider}"), &[])
            .await?;
        Ok(body.models)
    }

    async fn reset_llm_config(&self) -> Result<AckResponse, CoreError> {
        debug!("POST /api/llm/reset");
        let response = self
            .client
            .post(self.url("/api/llm/reset"))
            .send()
            .await
            .map_err(transport_error)?;
        expect_json(response).await
    }

    async fn analytics_metrics(&self, range: TimeRange) -> Result<AggregateMetrics, CoreError> {
        let envelope: Envelope<AggregateMetrics> = self
            .get_json(
                "/api/analytics/metrics",
                &[("time_range", range.as_str().to_string())],
            )
            .await?;
        envelope.into_data()
    }

    async fn analytics_candidates(
        &self,
        range: TimeRange,
        limit: u64,
        offset: u64,
        sort_by: &str,
        sort_order: &str,
    ) -> Result<CandidatePage, CoreError> {
        let envelope: Envelope<CandidatePage> = self
            .get_json(
                "/api/analytics/candidates",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("sort_by", sort_by.to_string()),
                    ("sort_order", sort_order.to_string()),
                ],
            )
            .await?;
        envelope.into_data()
    }

    async fn analytics_dashboard(&self, range: TimeRange) -> Result<DashboardSummary, CoreError> {
        let envelope: Envelope<DashboardSummary> = self
            .get_json(
                "/api/analytics/dashboard/summary",
                &[("time_range", range.as_str().to_string())],
            )
            .await?;
        envelope.into_data()
    }

    async fn analytics_skills(
        &self,
        range: TimeRange,
        top_n: u64,
    ) -> Result<SkillsAnalysis, CoreError> {
        let envelope: Envelope<SkillsAnalysis> = self
            .get_json(
                "/api/analytics/skills/analysis",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("top_n", top_n.to_string()),
                ],
            )
            .await?;
        envelope.into_data()
    }

    async fn analytics_export(
        &self,
        range: TimeRange,
        format: &str,
    ) -> Result<ExportPayload, CoreError> {
        let envelope: Envelope<ExportPayload> = self
            .get_json(
                "/api/analytics/export",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("format", format.to_string()),
                ],
            )
            .await?;
        envelope.into_data()
    }
}
