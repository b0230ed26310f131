//! External service port traits (ComfyUI backend, template and settings storage).

use async_trait::async_trait;
use serde_json::{Map, Value};

use comfydeck_domain::{
    GenerationSettings, HistoryEntry, PromptId, QueueSnapshot, WorkflowConfig, WorkflowGraph,
};

use super::error::{ComfyError, RepoError};

// =============================================================================
// ComfyUI Port
// =============================================================================

/// The slice of the ComfyUI HTTP API this application consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComfyApiPort: Send + Sync {
    /// Base URL used to build image view links.
    fn endpoint(&self) -> String;

    /// `POST /prompt`. `None` when the backend accepted the request but
    /// returned no `prompt_id`.
    async fn submit_prompt(&self, graph: &WorkflowGraph) -> Result<Option<PromptId>, ComfyError>;

    /// `GET /history/{id}`. `None` while the backend has no record yet.
    async fn history(&self, prompt_id: &PromptId) -> Result<Option<HistoryEntry>, ComfyError>;

    /// `GET /queue`
    async fn queue(&self) -> Result<QueueSnapshot, ComfyError>;

    /// `POST /queue {"delete": [...]}`
    async fn delete_from_queue(&self, prompt_ids: &[PromptId]) -> Result<(), ComfyError>;

    /// `POST /queue {"clear": ""}`
    async fn clear_queue(&self) -> Result<(), ComfyError>;

    /// `GET /object_info`
    async fn object_info(&self) -> Result<Value, ComfyError>;
}

// =============================================================================
// Storage Ports
// =============================================================================

/// Workflow templates: `<name>.json` graphs with `<name>_config.yaml` configs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepo: Send + Sync {
    async fn list(&self) -> Result<Vec<String>, RepoError>;
    async fn load_graph(&self, name: &str) -> Result<WorkflowGraph, RepoError>;
    async fn load_config(&self, name: &str) -> Result<WorkflowConfig, RepoError>;
}

/// Persisted generation settings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    /// Raw persisted document; `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<Map<String, Value>>, RepoError>;
    async fn save(&self, settings: &GenerationSettings) -> Result<(), RepoError>;
    async fn clear(&self) -> Result<(), RepoError>;
}
