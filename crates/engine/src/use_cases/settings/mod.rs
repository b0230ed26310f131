//! Settings use cases.
//!
//! The session holds the live settings; every change is written through to
//! the settings store.

use std::sync::Arc;

use serde_json::{Map, Value};

use comfydeck_domain::{DomainError, GenerationSettings};

use crate::infrastructure::ports::{RepoError, SettingsRepo};
use crate::stores::GenerationSession;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings: {0}")]
    Invalid(#[from] DomainError),
    #[error("Storage error: {0}")]
    Repo(#[from] RepoError),
}

/// Settings operations use case.
pub struct SettingsOps {
    repo: Arc<dyn SettingsRepo>,
    session: Arc<GenerationSession>,
}

impl SettingsOps {
    pub fn new(repo: Arc<dyn SettingsRepo>, session: Arc<GenerationSession>) -> Self {
        Self { repo, session }
    }

    /// Read persisted settings into the session, over the defaults.
    ///
    /// A missing or corrupt file is not fatal; the defaults are used.
    pub async fn load(&self) -> GenerationSettings {
        let settings = match self.repo.load().await {
            Ok(Some(persisted)) => GenerationSettings::from_persisted(persisted).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Persisted settings are invalid, using defaults");
                GenerationSettings::default()
            }),
            Ok(None) => GenerationSettings::default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load settings, using defaults");
                GenerationSettings::default()
            }
        };

        self.session.lock().await.settings = settings.clone();
        settings
    }

    pub async fn get(&self) -> GenerationSettings {
        self.session.lock().await.settings.clone()
    }

    /// Merge `patch` into the current settings and persist the result.
    pub async fn update(&self, patch: Map<String, Value>) -> Result<GenerationSettings, SettingsError> {
        let mut state = self.session.lock().await;
        let merged = state.settings.merge(patch)?;
        self.repo.save(&merged).await?;
        state.settings = merged.clone();
        Ok(merged)
    }

    /// Forget persisted settings and go back to the defaults. The current
    /// workflow selection is kept.
    pub async fn reset(&self) -> Result<GenerationSettings, SettingsError> {
        let mut state = self.session.lock().await;
        self.repo.clear().await?;

        let mut settings = GenerationSettings::default();
        if let Some(name) = &state.workflow_name {
            settings.workflow_name = name.clone();
        }
        state.settings = settings.clone();
        Ok(settings)
    }
}
