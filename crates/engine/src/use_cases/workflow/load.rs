//! Workflow listing and switching.

use std::sync::Arc;

use crate::infrastructure::ports::{RepoError, WorkflowRepo};
use crate::stores::GenerationSession;
use crate::use_cases::settings::SettingsOps;

use super::object_info::RefreshObjectInfo;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to load workflow '{name}': {source}")]
    Graph {
        name: String,
        #[source]
        source: RepoError,
    },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Graph { source, .. } => source.is_not_found(),
        }
    }
}

/// List available workflow templates.
pub struct ListWorkflows {
    repo: Arc<dyn WorkflowRepo>,
    session: Arc<GenerationSession>,
}

impl ListWorkflows {
    pub fn new(repo: Arc<dyn WorkflowRepo>, session: Arc<GenerationSession>) -> Self {
        Self { repo, session }
    }

    pub async fn execute(&self) -> Vec<String> {
        let names = self.repo.list().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to fetch workflows");
            Vec::new()
        });
        self.session.lock().await.workflow_names = names.clone();
        names
    }
}

/// Switch the session to a workflow template.
///
/// The graph is mandatory; a template without a readable config still loads
/// but binds nothing.
pub struct LoadWorkflow {
    repo: Arc<dyn WorkflowRepo>,
    session: Arc<GenerationSession>,
    settings: Arc<SettingsOps>,
    refresh: Arc<RefreshObjectInfo>,
}

impl LoadWorkflow {
    pub fn new(
        repo: Arc<dyn WorkflowRepo>,
        session: Arc<GenerationSession>,
        settings: Arc<SettingsOps>,
        refresh: Arc<RefreshObjectInfo>,
    ) -> Self {
        Self {
            repo,
            session,
            settings,
            refresh,
        }
    }

    pub async fn execute(&self, name: &str) -> Result<(), LoadError> {
        let graph = self.repo.load_graph(name).await.map_err(|source| {
            tracing::error!(workflow = %name, error = %source, "Failed to load workflow");
            LoadError::Graph {
                name: name.to_string(),
                source,
            }
        })?;

        let config = match self.repo.load_config(name).await {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(workflow = %name, error = %e, "Failed to load workflow config");
                None
            }
        };

        {
            let mut state = self.session.lock().await;
            state.graph = Some(graph);
            state.config = config;
            state.workflow_name = Some(name.to_string());
        }

        let mut remember = serde_json::Map::new();
        remember.insert("workflowName".to_string(), name.into());
        if let Err(e) = self.settings.update(remember).await {
            tracing::error!(error = %e, "Failed to persist workflow selection");
        }

        tracing::info!(workflow = %name, "Workflow loaded");
        self.refresh.execute().await;
        Ok(())
    }
}

/// Populate the session on startup: settings, template list, then the
/// remembered workflow (or the first one).
pub struct StartSession {
    settings: Arc<SettingsOps>,
    list: Arc<ListWorkflows>,
    load: Arc<LoadWorkflow>,
}

impl StartSession {
    pub fn new(settings: Arc<SettingsOps>, list: Arc<ListWorkflows>, load: Arc<LoadWorkflow>) -> Self {
        Self {
            settings,
            list,
            load,
        }
    }

    /// Returns the name of the workflow that ended up loaded.
    pub async fn execute(&self) -> Option<String> {
        let settings = self.settings.load().await;
        let names = self.list.execute().await;

        let remembered = Some(settings.workflow_name)
            .filter(|name| !name.is_empty() && names.contains(name));
        let target = remembered.or_else(|| names.first().cloned())?;

        match self.load.execute(&target).await {
            Ok(()) => Some(target),
            Err(_) => None,
        }
    }
}
