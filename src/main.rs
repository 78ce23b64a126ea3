mod analytics;
mod api;
mod error;
mod jd;
mod models;
mod navigator;
mod provider;
mod store;
mod upload;
mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use analytics::{export_file_contents, AnalyticsAggregator, AnalyticsSnapshot};
use anyhow::{anyhow, Context, Result};
use api::{AnalysisApi, HttpApi, DEFAULT_BASE_URL};
use clap::{Parser, Subcommand};
use jd::JobDescriptionStore;
use models::{BatchOutcome, ResumeAnalysis, TimeRange};
use navigator::BatchNavigator;
use provider::ProviderManager;
use store::{ConfigStore, SqliteStore};
use upload::{UploadResult, UploadState, Uploader};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Resume screening client - upload, rank, and analyze candidates")]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, env = "SIFT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more resume PDFs for analysis
    Analyze {
        /// Paths to PDF files
        files: Vec<PathBuf>,

        /// After a batch, also fetch the top-ranked candidate's full record
        #[arg(long)]
        detail: bool,
    },

    /// Show the full analysis record for a resume
    Show {
        /// Server-issued resume ID
        resume_id: String,
    },

    /// Manage the active job description
    Jd {
        #[command(subcommand)]
        command: JdCommands,
    },

    /// Manage the AI provider configuration
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },

    /// Analytics over processed candidates
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
}

#[derive(Subcommand)]
enum JdCommands {
    /// Show the current job description
    Show,

    /// Save a new job description
    Save {
        /// Job description text (or use --file)
        text: Option<String>,

        /// Read the job description from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Clear the saved job description
    Clear,

    /// Unlock the job description for editing (local only)
    Unlock,
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// Show the provider catalog and active selection
    Show,

    /// Switch the active provider
    Use {
        /// Provider ID (e.g. openrouter, ollama)
        provider: String,
    },

    /// List models offered by a provider
    Models {
        /// Provider ID
        provider: String,
    },

    /// Save the active selection to the service
    Save {
        /// API key for remote providers
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL for local providers
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Reset the service configuration to its defaults
    Reset,
}

#[derive(Subcommand)]
enum AnalyticsCommands {
    /// Show the analytics dashboard
    Dashboard {
        /// Time window to aggregate over
        #[arg(short, long, value_enum, default_value = "all-time")]
        range: TimeRange,
    },

    /// Export candidate data to a file
    Export {
        /// Time window to export
        #[arg(short, long, value_enum, default_value = "all-time")]
        range: TimeRange,

        /// Export format (json or csv)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api: Arc<dyn AnalysisApi> = Arc::new(HttpApi::new(cli.base_url));
    let cache: Arc<dyn ConfigStore> = Arc::new(SqliteStore::open()?);

    match cli.command {
        Commands::Analyze { files, detail } => {
            if files.is_empty() {
                println!("No files given.");
                return Ok(());
            }
            let mut uploader = Uploader::new(api.clone());
            match uploader.submit(&files).await {
                UploadState::Succeeded(UploadResult::Single(analysis)) => {
                    print_analysis(analysis);
                }
                UploadState::Succeeded(UploadResult::Batch(outcome)) => {
                    print_batch(outcome);
                    if detail {
                        open_top_candidate(api.clone(), outcome.clone()).await;
                    }
                }
                UploadState::Failed(message) => {
                    return Err(anyhow!("{message}"));
                }
                UploadState::Idle | UploadState::Submitting => {}
            }
        }

        Commands::Show { resume_id } => {
            let analysis = api
                .get_analysis(&resume_id)
                .await
                .map_err(|e| anyhow!("{e}"))?;
            print_analysis(&analysis);
        }

        Commands::Jd { command } => {
            let store = JobDescriptionStore::new(api, cache);
            match command {
                JdCommands::Show => {
                    let jd = store.load().await;
                    if jd.text.is_empty() {
                        println!("No job description saved.");
                    } else {
                        println!(
                            "Job description ({}):",
                            if jd.locked { "locked" } else { "editable" }
                        );
                        println!("{}", jd.text);
                    }
                }

                JdCommands::Save { text, file } => {
                    let text = match (text, file) {
                        (Some(text), None) => text,
                        (None, Some(path)) => std::fs::read_to_string(&path).with_context(
                            || format!("Failed to read {}", path.display()),
                        )?,
                        _ => return Err(anyhow!("Give the text inline or via --file, not both")),
                    };
                    let outcome = store.save(&text).await.map_err(|e| anyhow!("{e}"))?;
                    if outcome.durable {
                        println!("Job description saved.");
                    } else {
                        println!(
                            "Saved locally only; the service was unreachable ({}).",
                            outcome.detail.unwrap_or_default()
                        );
                    }
                }

                JdCommands::Clear => {
                    let outcome = store.clear().await;
                    if outcome.durable {
                        println!("Job description cleared.");
                    } else {
                        println!(
                            "Cleared locally; the service was unreachable ({}).",
                            outcome.detail.unwrap_or_default()
                        );
                    }
                }

                JdCommands::Unlock => {
                    store.unlock();
                    println!("Job description unlocked for editing. Save to persist changes.");
                }
            }
        }

        Commands::Provider { command } => {
            let mut manager = ProviderManager::new(api, cache);
            match command {
                ProviderCommands::Show => {
                    let catalog = manager.load_catalog().await;
                    if catalog.degraded {
                        println!("(service unreachable - showing built-in fallback catalog)\n");
                    }
                    let active = &catalog.active;
                    println!("Active: {} / {}", active.provider, active.model);
                    println!(
                        "API key: {}",
                        if active.credential_present { "set" } else { "not set" }
                    );
                    if let Some(url) = &active.base_url {
                        println!("Base URL: {}", url);
                    }
                    println!("\nProviders:");
                    for provider in &catalog.providers {
                        let count = catalog.models.get(provider).map_or(0, Vec::len);
                        println!("  {:<12} {} model(s)", provider, count);
                    }
                }

                ProviderCommands::Use { provider } => {
                    manager.load_catalog().await;
                    manager
                        .select_provider(&provider)
                        .await
                        .map_err(|e| anyhow!("{e}"))?;
                    let active = manager.active().ok_or_else(|| anyhow!("No catalog loaded"))?;
                    println!("Switched to {} / {}", active.provider, active.model);
                }

                ProviderCommands::Models { provider } => {
                    manager.load_catalog().await;
                    let models = manager
                        .fetch_models(&provider)
                        .await
                        .map_err(|e| anyhow!("{e}"))?;
                    if models.is_empty() {
                        println!("No models offered by '{}'.", provider);
                    } else {
                        for model in models {
                            println!("  {}", model);
                        }
                    }
                }

                ProviderCommands::Save { api_key, base_url } => {
                    manager.load_catalog().await;
                    let ack = manager
                        .save(api_key.as_deref(), base_url.as_deref())
                        .await
                        .map_err(|e| anyhow!("{e}"))?;
                    if ack.success {
                        println!("Provider configuration saved.");
                    } else {
                        return Err(anyhow!("Service rejected the update: {}", ack.message));
                    }
                }

                ProviderCommands::Reset => {
                    let ack = manager.reset().await.map_err(|e| anyhow!("{e}"))?;
                    if ack.success {
                        println!("Provider configuration reset to defaults.");
                    } else {
                        return Err(anyhow!("Service rejected the reset: {}", ack.message));
                    }
                }
            }
        }

        Commands::Analytics { command } => {
            let aggregator = AnalyticsAggregator::new(api);
            match command {
                AnalyticsCommands::Dashboard { range } => {
                    let snapshot = aggregator.load_snapshot(range).await;
                    if snapshot.is_empty() {
                        return Err(anyhow!(
                            "No analytics available ({} queries failed)",
                            snapshot.failed.len()
                        ));
                    }
                    print_snapshot(&snapshot);
                }

                AnalyticsCommands::Export {
                    range,
                    format,
                    output,
                } => {
                    let payload = aggregator
                        .export(range, &format)
                        .await
                        .map_err(|e| anyhow!("{e}"))?;
                    let contents = export_file_contents(&payload).map_err(|e| anyhow!("{e}"))?;
                    let path = output.unwrap_or_else(|| {
                        PathBuf::from(format!(
                            "candidates_{}_{}.{}",
                            range.as_str(),
                            chrono::Local::now().format("%Y-%m-%d"),
                            format.to_lowercase()
                        ))
                    });
                    std::fs::write(&path, contents)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Exported {} record(s) to {}",
                        payload.record_count,
                        path.display()
                    );
                }
            }
        }
    }

    Ok(())
}

async fn open_top_candidate(api: Arc<dyn AnalysisApi>, outcome: BatchOutcome) {
    let Some(top) = outcome.ranked_resumes.first().cloned() else {
        return;
    };
    let mut navigator = BatchNavigator::new(api, outcome);
    println!("\n--- Top candidate ---");
    match navigator.open(&top.resume_id).await {
        Some(analysis) => print_analysis(analysis),
        None => println!(
            "Could not fetch {}: {}",
            top.resume_id,
            navigator.open_error().unwrap_or("unknown error")
        ),
    }
}

fn print_analysis(analysis: &ResumeAnalysis) {
    println!("Resume {}", analysis.resume_id);
    println!("Name: {}", analysis.full_name);
    if !analysis.email.is_empty() {
        println!("Email: {}", analysis.email);
    }
    if !analysis.phone_number.is_empty() {
        println!("Phone: {}", analysis.phone_number);
    }
    println!("Experience: {:.1} years", analysis.total_experience_years);
    println!(
        "Fit score: {:.1} ({})",
        analysis.fit_score, analysis.eligibility_status
    );
    if !analysis.eligibility_reason.is_empty() {
        println!("Reason: {}", analysis.eligibility_reason);
    }
    if !analysis.roles.is_empty() {
        println!("\nRoles:");
        for role in &analysis.roles {
            println!("  {} at {} ({:.1}y)", role.title, role.company, role.years);
        }
    }
    if !analysis.skills.is_empty() {
        let mut skills: Vec<&str> = analysis.skills.keys().map(String::as_str).collect();
        skills.sort_unstable();
        println!("\nSkills: {}", skills.join(", "));
    }
    if analysis.leadership_signals {
        println!("\nLeadership: {}", analysis.leadership_justification);
    }
    if !analysis.candidate_fit_summary.is_empty() {
        println!("\nSummary: {}", analysis.candidate_fit_summary);
    }
}

fn print_batch(outcome: &BatchOutcome) {
    println!(
        "Processed {} file(s): {} succeeded, {} failed\n",
        outcome.total_processed, outcome.successful_analyses, outcome.failed_analyses
    );
    if !outcome.ranked_resumes.is_empty() {
        println!("{:<5} {:<24} {:<24} {:<20} {:>6}", "RANK", "ID", "CANDIDATE", "FILE", "SCORE");
        println!("{}", "-".repeat(83));
        for (i, entry) in outcome.ranked_resumes.iter().enumerate() {
            println!(
                "{:<5} {:<24} {:<24} {:<20} {:>6.1}",
                i + 1,
                truncate(&entry.resume_id, 22),
                truncate(&entry.candidate_name, 22),
                truncate(&entry.filename, 18),
                entry.fit_score
            );
        }
    }
    if !outcome.failed_files.is_empty() {
        println!("\nFailed files:");
        for failed in &outcome.failed_files {
            println!("  {} - {}", failed.filename, failed.error);
        }
    }
}

fn print_snapshot(snapshot: &AnalyticsSnapshot) {
    if let Some(metrics) = &snapshot.metrics {
        println!("Candidates:       {}", metrics.total_candidates);
        println!("Avg fit score:    {:.1}", metrics.average_fit_score);
        println!("Eligibility rate: {:.0}%", metrics.eligibility_rate * 100.0);
    }
    if let Some(dashboard) = &snapshot.dashboard {
        if !dashboard.key_metrics.top_skill.is_empty() {
            println!("Top skill:        {}", dashboard.key_metrics.top_skill);
        }
    }
    if let Some(skills) = &snapshot.skills {
        if !skills.top_skills.is_empty() {
            println!("\nTop skills:");
            for skill in &skills.top_skills {
                println!("  {:<24} {:>4} ({:.0}%)", truncate(&skill.skill, 22), skill.count, skill.percentage);
            }
        }
    }
    if let Some(page) = &snapshot.candidates {
        if !page.candidates.is_empty() {
            println!(
                "\n{:<24} {:<24} {:>6} {:<12} {:>7}",
                "ID", "NAME", "SCORE", "STATUS", "SKILLS"
            );
            println!("{}", "-".repeat(78));
            for row in &page.candidates {
                println!(
                    "{:<24} {:<24} {:>6.1} {:<12} {:>7}",
                    truncate(&row.resume_id, 22),
                    truncate(row.full_name.as_deref().unwrap_or("-"), 22),
                    row.fit_score,
                    truncate(&row.eligibility_status, 10),
                    row.skills_count
                );
            }
            println!(
                "Showing {} of {} candidate(s)",
                page.returned_count, page.total_count
            );
        }
    }
    if !snapshot.failed.is_empty() {
        println!("\n(unavailable: {})", snapshot.failed.join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        // Multi-byte names must not panic mid-character
        assert_eq!(truncate("Žofia Kovačević-Àlvarez", 10), "Žofia K...");
        assert_eq!(truncate("張偉", 10), "張偉");
    }

    #[test]
    fn print_analysis_renders_populated_record() {
        let mut skills = HashMap::new();
        skills.insert(
            "rust".to_string(),
            models::SkillEvidence {
                source: "roles".to_string(),
                years: "4".to_string(),
            },
        );
        let analysis = ResumeAnalysis {
            resume_id: "r1".to_string(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "555-0100".to_string(),
            total_experience_years: 6.0,
            roles: vec![models::RoleEntry {
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                years: 3.0,
            }],
            skills,
            projects: vec![],
            leadership_signals: true,
            leadership_justification: "led a team of four".to_string(),
            candidate_fit_summary: "strong match".to_string(),
            fit_score: 8.5,
            eligibility_status: "eligible".to_string(),
            eligibility_reason: "meets requirements".to_string(),
        };
        // Must not panic on any populated field
        print_analysis(&analysis);
    }
}
