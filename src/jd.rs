use std::sync::Arc;
use tracing::warn;

use crate::api::{AnalysisApi, RemoteJobDescription};
use crate::error::CoreError;
use crate::store::{ConfigStore, KEY_JD_LOCKED, KEY_JOB_DESCRIPTION};

/// The active job description plus its editable/locked flag. Exactly one
/// is active at a time; the remote service reads it implicitly during
/// analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub text: String,
    pub locked: bool,
}

impl JobDescription {
    fn empty() -> Self {
        Self {
            text: String::new(),
            locked: false,
        }
    }
}

/// Result of a save or clear. `durable` is false when the remote store
/// could not be reached; the text still lands in the local cache for
/// offline continuity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub durable: bool,
    pub detail: Option<String>,
}

/// Reconciles the job description between the remote service and the
/// local cache. Remote wins whenever it is reachable; the cache only
/// answers when it is not.
pub struct JobDescriptionStore {
    api: Arc<dyn AnalysisApi>,
    cache: Arc<dyn ConfigStore>,
}

impl JobDescriptionStore {
    pub fn new(api: Arc<dyn AnalysisApi>, cache: Arc<dyn ConfigStore>) -> Self {
        Self { api, cache }
    }

    /// Fetch the current job description. A non-empty remote value is
    /// treated as already committed (locked). Remote failure falls back
    /// to the last mirrored value, defaulting to empty and unlocked.
    pub async fn load(&self) -> JobDescription {
        match self.api.get_job_description().await {
            Ok(RemoteJobDescription::Found(text)) => {
                let locked = !text.trim().is_empty();
                self.cache_put(KEY_JOB_DESCRIPTION, &text);
                self.cache_put(KEY_JD_LOCKED, if locked { "true" } else { "false" });
                JobDescription { text, locked }
            }
            Ok(RemoteJobDescription::NotFound) => {
                // Nothing saved server-side; drop any stale mirror.
                self.cache_drop(KEY_JOB_DESCRIPTION);
                self.cache_drop(KEY_JD_LOCKED);
                JobDescription::empty()
            }
            Err(err) => {
                warn!("job description fetch failed, using cached copy: {err}");
                let text = self.cache_get(KEY_JOB_DESCRIPTION).unwrap_or_default();
                let locked = self.cache_get(KEY_JD_LOCKED).as_deref() == Some("true");
                JobDescription { text, locked }
            }
        }
    }

    /// Persist a new job description. Blank text and a still-locked
    /// description are both rejected before any network call; a committed
    /// description must be unlocked before it can be overwritten. The
    /// cache is updated regardless of the remote outcome, but the lock
    /// engages only on a durable save.
    pub async fn save(&self, text: &str) -> Result<SaveOutcome, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::validation("Job description cannot be empty"));
        }
        if self.is_locked() {
            return Err(CoreError::validation(
                "Job description is locked; unlock it before editing",
            ));
        }

        let remote = self.api.save_job_description(text).await;
        self.cache_put(KEY_JOB_DESCRIPTION, text);
        match remote {
            Ok(()) => {
                self.cache_put(KEY_JD_LOCKED, "true");
                Ok(SaveOutcome {
                    durable: true,
                    detail: None,
                })
            }
            Err(err) => {
                self.cache_put(KEY_JD_LOCKED, "false");
                Ok(SaveOutcome {
                    durable: false,
                    detail: Some(err.to_string()),
                })
            }
        }
    }

    /// Clear by overwriting the remote value with an empty string (there
    /// is no delete endpoint). Local cache entries go away no matter what
    /// the remote says.
    pub async fn clear(&self) -> SaveOutcome {
        let remote = self.api.save_job_description("").await;
        self.cache_drop(KEY_JOB_DESCRIPTION);
        self.cache_drop(KEY_JD_LOCKED);
        match remote {
            Ok(()) => SaveOutcome {
                durable: true,
                detail: None,
            },
            Err(err) => SaveOutcome {
                durable: false,
                detail: Some(err.to_string()),
            },
        }
    }

    /// Local-only transition back to editable. A subsequent `save` is
    /// required to persist the edit.
    pub fn unlock(&self) {
        self.cache_put(KEY_JD_LOCKED, "false");
    }

    fn is_locked(&self) -> bool {
        self.cache_get(KEY_JD_LOCKED).as_deref() == Some("true")
    }

    fn cache_get(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("cache read failed for {key}: {err}");
                None
            }
        }
    }

    fn cache_put(&self, key: &str, value: &str) {
        if let Err(err) = self.cache.set(key, value) {
            warn!("cache write failed for {key}: {err}");
        }
    }

    fn cache_drop(&self, key: &str) {
        if let Err(err) = self.cache.remove(key) {
            warn!("cache remove failed for {key}: {err}");
        }
    }
}
