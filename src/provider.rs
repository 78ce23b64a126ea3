use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::api::AnalysisApi;
use crate::error::CoreError;
use crate::models::{AckResponse, ProviderUpdate};
use crate::store::{ConfigStore, KEY_LLM_SETTINGS};

/// The provider that runs locally and authenticates with a base URL
/// instead of an API key.
const LOCAL_PROVIDER: &str = "ollama";

const DEFAULT_PROVIDER: &str = "openrouter";
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSelection {
    pub provider: String,
    pub model: String,
    pub credential_present: bool,
    pub base_url: Option<String>,
}

/// Catalog of providers and their models plus the active selection.
/// `degraded` marks a locally synthesized fallback; degraded data must
/// never be persisted as authoritative.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    pub providers: Vec<String>,
    pub models: HashMap<String, Vec<String>>,
    pub active: ActiveSelection,
    pub degraded: bool,
}

/// Locally cached selection. Credentials never land here; only the fact
/// that one is set server-side.
#[derive(Debug, Serialize, Deserialize)]
struct CachedSelection {
    provider: String,
    model: String,
    credential_present: bool,
    #[serde(default)]
    base_url: Option<String>,
}

pub struct ProviderManager {
    api: Arc<dyn AnalysisApi>,
    cache: Arc<dyn ConfigStore>,
    catalog: Option<ProviderCatalog>,
}

impl ProviderManager {
    pub fn new(api: Arc<dyn AnalysisApi>, cache: Arc<dyn ConfigStore>) -> Self {
        Self {
            api,
            cache,
            catalog: None,
        }
    }

    pub fn catalog(&self) -> Option<&ProviderCatalog> {
        self.catalog.as_ref()
    }

    pub fn active(&self) -> Option<&ActiveSelection> {
        self.catalog.as_ref().map(|c| &c.active)
    }

    /// Fetch the provider catalog. On remote failure a built-in degraded
    /// catalog is substituted and flagged; this never errors.
    pub async fn load_catalog(&mut self) -> &ProviderCatalog {
        let catalog = match self.api.get_llm_config().await {
            Ok(resp) => {
                let mut active = ActiveSelection {
                    provider: resp.current_config.provider,
                    model: resp.current_config.model,
                    credential_present: resp.current_config.has_api_key,
                    base_url: resp.current_config.base_url,
                };
                // Revalidate a provisional selection against the fresh
                // catalog: the model must exist for its provider.
                if let Some(models) = resp.provider_models.get(&active.provider) {
                    if !models.is_empty() && !models.contains(&active.model) {
                        active.model = models[0].clone();
                    }
                }
                let catalog = ProviderCatalog {
                    providers: resp.available_providers,
                    models: resp.provider_models,
                    active,
                    degraded: false,
                };
                self.persist_selection(&catalog.active);
                catalog
            }
            Err(err) => {
                warn!("provider catalog fetch failed, using degraded fallback: {err}");
                self.degraded_catalog()
            }
        };
        self.catalog.insert(catalog)
    }

    /// Switch the active provider, defaulting the model to the first
    /// known entry. When the catalog has no models for the provider they
    /// are fetched first; that fetch failing propagates and leaves both
    /// the catalog and the selection untouched.
    pub async fn select_provider(&mut self, provider_id: &str) -> Result<(), CoreError> {
        let Some(catalog) = self.catalog.as_mut() else {
            return Err(CoreError::validation(
                "Provider catalog not loaded; run a catalog refresh first",
            ));
        };

        let known = catalog
            .models
            .get(provider_id)
            .filter(|models| !models.is_empty())
            .cloned();
        let models = match known {
            Some(models) => models,
            None => {
                let fetched = self.api.get_provider_models(provider_id).await?;
                catalog
                    .models
                    .insert(provider_id.to_string(), fetched.clone());
                fetched
            }
        };

        catalog.active.provider = provider_id.to_string();
        catalog.active.model = models.first().cloned().unwrap_or_default();
        if !catalog.degraded {
            let active = catalog.active.clone();
            self.persist_selection(&active);
        }
        Ok(())
    }

    /// Remote model list for one provider, merged into the catalog on
    /// success. No silent fallback: a failure here must not corrupt the
    /// rest of the catalog.
    pub async fn fetch_models(&mut self, provider_id: &str) -> Result<Vec<String>, CoreError> {
        let models = self.api.get_provider_models(provider_id).await?;
        if let Some(catalog) = self.catalog.as_mut() {
            catalog
                .models
                .insert(provider_id.to_string(), models.clone());
        }
        Ok(models)
    }

    /// Persist the active selection remotely. Requires a credential (or a
    /// base URL for the local provider) and an authoritative catalog;
    /// degraded data is refused. The caller re-runs `load_catalog` after
    /// a successful save to pick up authoritative state.
    pub async fn save(
        &mut self,
        api_key: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<AckResponse, CoreError> {
        let Some(catalog) = self.catalog.as_ref() else {
            return Err(CoreError::validation(
                "Provider catalog not loaded; run a catalog refresh first",
            ));
        };
        if catalog.degraded {
            return Err(CoreError::validation(
                "Provider catalog is in degraded fallback mode; refresh it before saving",
            ));
        }

        let active = &catalog.active;
        let is_local = active.provider == LOCAL_PROVIDER;
        if is_local {
            if base_url.map(str::trim).unwrap_or_default().is_empty() {
                return Err(CoreError::validation("Base URL is required"));
            }
        } else if api_key.map(str::trim).unwrap_or_default().is_empty()
            && !active.credential_present
        {
            return Err(CoreError::validation("API key is required"));
        }

        let update = ProviderUpdate {
            provider: active.provider.clone(),
            model: active.model.clone(),
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
        };
        let ack = self.api.update_llm_config(&update).await?;

        if ack.success {
            let credential_present = api_key.is_some() || active.credential_present;
            let selection = ActiveSelection {
                provider: active.provider.clone(),
                model: active.model.clone(),
                credential_present,
                base_url: base_url.map(str::to_string).or_else(|| active.base_url.clone()),
            };
            if let Some(catalog) = self.catalog.as_mut() {
                catalog.active = selection.clone();
            }
            self.persist_selection(&selection);
        }
        Ok(ack)
    }

    /// Reset the remote configuration to its defaults. On success the
    /// locally cached selection is dropped; any credential the caller
    /// held must be discarded (it is never read back for display).
    pub async fn reset(&mut self) -> Result<AckResponse, CoreError> {
        let ack = self.api.reset_llm_config().await?;
        if ack.success {
            if let Err(err) = self.cache.remove(KEY_LLM_SETTINGS) {
                warn!("cache remove failed for {KEY_LLM_SETTINGS}: {err}");
            }
            self.catalog = None;
        }
        Ok(ack)
    }

    fn degraded_catalog(&self) -> ProviderCatalog {
        let mut models = HashMap::new();
        models.insert(
            "openrouter".to_string(),
            vec![
                DEFAULT_MODEL.to_string(),
                "mistralai/mistral-small".to_string(),
                "meta-llama/llama-3-70b-instruct".to_string(),
            ],
        );
        models.insert(LOCAL_PROVIDER.to_string(), vec!["llama3".to_string()]);

        // A previously mirrored selection is provisional until the next
        // successful refresh revalidates it.
        let active = self.cached_selection().unwrap_or(ActiveSelection {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            credential_present: false,
            base_url: None,
        });

        ProviderCatalog {
            providers: vec!["openrouter".to_string(), LOCAL_PROVIDER.to_string()],
            models,
            active,
            degraded: true,
        }
    }

    fn cached_selection(&self) -> Option<ActiveSelection> {
        let raw = match self.cache.get(KEY_LLM_SETTINGS) {
            Ok(value) => value?,
            Err(err) => {
                warn!("cache read failed for {KEY_LLM_SETTINGS}: {err}");
                return None;
            }
        };
        match serde_json::from_str::<CachedSelection>(&raw) {
            Ok(cached) => Some(ActiveSelection {
                provider: cached.provider,
                model: cached.model,
                credential_present: cached.credential_present,
                base_url: cached.base_url,
            }),
            Err(err) => {
                warn!("discarding unreadable cached selection: {err}");
                None
            }
        }
    }

    fn persist_selection(&self, active: &ActiveSelection) {
        let cached = CachedSelection {
            provider: active.provider.clone(),
            model: active.model.clone(),
            credential_present: active.credential_present,
            base_url: active.base_url.clone(),
        };
        match serde_json::to_string(&cached) {
            Ok(blob) => {
                if let Err(err) = self.cache.set(KEY_LLM_SETTINGS, &blob) {
                    warn!("cache write failed for {KEY_LLM_SETTINGS}: {err}");
                }
            }
            Err(err) => warn!("failed to encode selection: {err}"),
        }
    }
}
