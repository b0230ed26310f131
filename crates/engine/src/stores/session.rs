//! Generation session state.
//!
//! One session per running server: the loaded workflow, the user's
//! settings, the resolved option lists, the gallery and the local job
//! queue. Handlers and the poller share it through an `Arc`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use comfydeck_domain::{
    GenerationSettings, PendingJobs, ResolvedOptions, WorkflowConfig, WorkflowGraph,
};

/// Mutable session state. Never hold the lock across a backend call.
#[derive(Debug, Default)]
pub struct SessionState {
    pub workflow_names: Vec<String>,
    pub workflow_name: Option<String>,
    pub graph: Option<WorkflowGraph>,
    pub config: Option<WorkflowConfig>,
    pub settings: GenerationSettings,
    pub options: ResolvedOptions,
    /// Most recent first
    pub preview_images: Vec<String>,
    pub pending: PendingJobs,
}

/// What the frontend needs to render the panel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub workflow_name: Option<String>,
    pub workflow_names: Vec<String>,
    pub workflow_config: Option<WorkflowConfig>,
    pub is_generating: bool,
    pub queue_count: usize,
    pub preview_images: Vec<String>,
    pub list_item_data: BTreeMap<String, Vec<Value>>,
}

pub struct GenerationSession {
    state: Mutex<SessionState>,
    generating: AtomicBool,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::with_state(SessionState::default())
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Mutex::new(state),
            generating: AtomicBool::new(false),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Non-blocking lock, for synchronous test doubles.
    #[cfg(test)]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, SessionState>> {
        self.state.try_lock().ok()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Claim the single generation slot. `None` while another run holds it.
    pub fn try_begin(self: &Arc<Self>) -> Option<GenerationGuard> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GenerationGuard {
                session: Arc::clone(self),
            })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock().await;
        SessionSnapshot {
            workflow_name: state.workflow_name.clone(),
            workflow_names: state.workflow_names.clone(),
            workflow_config: state.config.clone(),
            is_generating: self.is_generating(),
            queue_count: state.pending.len(),
            preview_images: state.preview_images.clone(),
            list_item_data: state.options.list_items.clone(),
        }
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the generation slot; released on drop, whatever path the run took.
pub struct GenerationGuard {
    session: Arc<GenerationSession>,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.session.generating.store(false, Ordering::Release);
    }
}
