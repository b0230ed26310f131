//! Cancellation of waiting jobs.

use std::sync::Arc;

use serde::Serialize;

use comfydeck_domain::PromptId;

use crate::infrastructure::ports::ComfyApiPort;
use crate::stores::GenerationSession;

/// What a cancel request did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    /// Job the backend was executing; it is left to finish
    pub running: Option<PromptId>,
    /// Pending ids the backend was asked to delete
    pub deleted: Vec<PromptId>,
    /// Whether the backend accepted the delete request
    pub delete_accepted: bool,
}

/// Delete every job still waiting in the backend queue. The running job is
/// never cancelled; afterwards the local queue tracks only that job.
pub struct CancelGeneration {
    comfy: Arc<dyn ComfyApiPort>,
    session: Arc<GenerationSession>,
}

impl CancelGeneration {
    pub fn new(comfy: Arc<dyn ComfyApiPort>, session: Arc<GenerationSession>) -> Self {
        Self { comfy, session }
    }

    pub async fn execute(&self) -> CancelOutcome {
        let mut outcome = CancelOutcome::default();

        match self.comfy.queue().await {
            Ok(snapshot) => {
                outcome.running = snapshot.running_id();
                outcome.deleted = snapshot.pending_ids();
                if let Some(running) = &outcome.running {
                    tracing::info!(prompt_id = %running, "Currently running job will not be cancelled");
                }

                if outcome.deleted.is_empty() {
                    tracing::info!("No queue items to cancel");
                } else {
                    self.delete_pending(&mut outcome).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error cancelling generation");
            }
        }

        // Older backends only understand `clear`; the result does not matter.
        if let Err(e) = self.comfy.clear_queue().await {
            tracing::debug!(error = %e, "Queue clear request failed");
        }

        outcome
    }

    async fn delete_pending(&self, outcome: &mut CancelOutcome) {
        if let Err(e) = self.comfy.delete_from_queue(&outcome.deleted).await {
            tracing::error!(error = %e, "Failed to cancel generation");
            return;
        }
        outcome.delete_accepted = true;

        let mut state = self.session.lock().await;
        match &outcome.running {
            Some(running) => {
                state.pending.retain_only(running.clone());
                tracing::info!(prompt_id = %running, "Pending generations cancelled");
            }
            None => {
                // The poller sees the empty queue and releases the run.
                state.pending.clear();
                tracing::info!("All generations cancelled");
            }
        }
    }
}
