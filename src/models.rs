use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub tech_stack: serde_json::Value, // string or list, server is inconsistent
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillEvidence {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub years: String,
}

/// Structured result for one analyzed resume. Immutable once returned;
/// identified by the server-issued `resume_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    #[serde(default)]
    pub resume_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub total_experience_years: f64,
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
    #[serde(default)]
    pub skills: HashMap<String, SkillEvidence>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub leadership_signals: bool,
    #[serde(default)]
    pub leadership_justification: String,
    #[serde(default)]
    pub candidate_fit_summary: String,
    #[serde(default)]
    pub fit_score: f64,
    #[serde(default)]
    pub eligibility_status: String,
    #[serde(default)]
    pub eligibility_reason: String,
}

/// One entry in the server-ranked batch list. The order is the server's
/// (descending fit score) and is never re-sorted client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResume {
    pub resume_id: String,
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub fit_score: f64,
    #[serde(default)]
    pub fit_score_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub filename: String,
    pub error: String,
    #[serde(default)]
    pub resume_id: Option<String>,
}

/// Aggregate of one batch submission. Per-file failures live in
/// `failed_files`; they do not fail the submission itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    #[serde(default)]
    pub total_processed: usize,
    #[serde(default)]
    pub successful_analyses: usize,
    #[serde(default)]
    pub failed_analyses: usize,
    #[serde(default)]
    pub ranked_resumes: Vec<RankedResume>,
    #[serde(default)]
    pub failed_files: Vec<FailedFile>,
}

// --- LLM provider configuration ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub has_api_key: bool,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Wire shape of GET /api/llm/config.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfigResponse {
    pub current_config: CurrentProviderConfig,
    #[serde(default)]
    pub available_providers: Vec<String>,
    #[serde(default)]
    pub provider_models: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUpdate {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// --- Analytics ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TimeRange {
    Today,
    Week,
    Month,
    Quarter,
    Year,
    AllTime,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Quarter => "quarter",
            TimeRange::Year => "year",
            TimeRange::AllTime => "all_time",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillFrequency {
    pub skill: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateMetrics {
    #[serde(default)]
    pub total_candidates: u64,
    #[serde(default)]
    pub average_fit_score: f64,
    #[serde(default)]
    pub eligibility_rate: f64,
    #[serde(default)]
    pub top_skills: Vec<SkillFrequency>,
    #[serde(default)]
    pub experience_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub eligibility_distribution: HashMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateRow {
    pub resume_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub fit_score: f64,
    #[serde(default)]
    pub eligibility_status: String,
    #[serde(default)]
    pub skills_count: u64,
    #[serde(default)]
    pub experience_years: Option<f64>,
    #[serde(default)]
    pub processed_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePage {
    #[serde(default)]
    pub candidates: Vec<CandidateRow>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub returned_count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardKeyMetrics {
    #[serde(default)]
    pub total_candidates: u64,
    #[serde(default)]
    pub average_fit_score: f64,
    #[serde(default)]
    pub eligibility_rate: f64,
    #[serde(default)]
    pub top_skill: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardCharts {
    #[serde(default)]
    pub experience_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub eligibility_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub top_skills: Vec<SkillFrequency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSummary {
    pub key_metrics: DashboardKeyMetrics,
    #[serde(default)]
    pub charts_data: Option<DashboardCharts>,
    #[serde(default)]
    pub time_range: String,
    #[serde(default)]
    pub generated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillsAnalysis {
    #[serde(default)]
    pub top_skills: Vec<SkillFrequency>,
    #[serde(default)]
    pub unique_skills_count: u64,
    #[serde(default)]
    pub average_skills_per_candidate: f64,
    #[serde(default)]
    pub total_skill_mentions: u64,
    #[serde(default)]
    pub total_candidates: u64,
}
