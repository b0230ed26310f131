//! Option lists from the backend manifest.

use std::sync::Arc;

use serde_json::Value;

use comfydeck_domain::workflow::object_info;
use comfydeck_domain::ResolvedOptions;

use crate::infrastructure::ports::ComfyApiPort;
use crate::stores::GenerationSession;
use crate::use_cases::settings::SettingsOps;

/// Fetch `/object_info`, rebuild the option lists for the loaded workflow
/// and seed any settings that are still unset.
pub struct RefreshObjectInfo {
    comfy: Arc<dyn ComfyApiPort>,
    session: Arc<GenerationSession>,
    settings: Arc<SettingsOps>,
}

impl RefreshObjectInfo {
    pub fn new(
        comfy: Arc<dyn ComfyApiPort>,
        session: Arc<GenerationSession>,
        settings: Arc<SettingsOps>,
    ) -> Self {
        Self {
            comfy,
            session,
            settings,
        }
    }

    pub async fn execute(&self) -> ResolvedOptions {
        let manifest = match self.comfy.object_info().await {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load object info");
                let mut state = self.session.lock().await;
                state.options = ResolvedOptions::default();
                return state.options.clone();
            }
        };

        self.apply(&manifest).await
    }

    async fn apply(&self, manifest: &Value) -> ResolvedOptions {
        let resolved = {
            let mut state = self.session.lock().await;
            let resolved = object_info::resolve(manifest, state.config.as_ref(), &state.settings);
            state.options = resolved.clone();
            resolved
        };

        for (id, error) in &resolved.unresolved {
            tracing::warn!(setting = %id, error = %error, "Option list path not found in object info");
        }

        if !resolved.seeded_defaults.is_empty() {
            tracing::debug!(
                fields = ?resolved.seeded_defaults.keys().collect::<Vec<_>>(),
                "Seeding unset settings from option lists"
            );
            if let Err(e) = self.settings.update(resolved.seeded_defaults.clone()).await {
                tracing::error!(error = %e, "Failed to persist seeded settings");
            }
        }

        resolved
    }
}
