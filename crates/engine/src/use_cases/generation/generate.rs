//! Batch submission.

use std::sync::Arc;

use serde_json::Value;

use comfydeck_domain::{bind, BindingCategory, PromptId};

use crate::infrastructure::ports::{ComfyApiPort, ComfyError, RandomPort};
use crate::stores::{GenerationGuard, GenerationSession};

use super::poll::PollJobs;

/// Seeds are drawn from `[0, SEED_RANGE)`.
pub const SEED_RANGE: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Ids the backend accepted, in submission order
    Submitted { prompt_ids: Vec<PromptId> },
    /// Another run holds the generation slot
    AlreadyRunning,
    /// No workflow graph is loaded
    NoWorkflow,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A submission request failed; jobs queued before it are still polled.
    #[error("Image generation request failed: {source}")]
    Submission {
        submitted: Vec<PromptId>,
        #[source]
        source: ComfyError,
    },
}

/// Bind the current settings into the workflow and submit one job per
/// batch unit, each with a fresh seed.
pub struct GenerateImages {
    comfy: Arc<dyn ComfyApiPort>,
    random: Arc<dyn RandomPort>,
    session: Arc<GenerationSession>,
    poll: Arc<PollJobs>,
}

impl GenerateImages {
    pub fn new(
        comfy: Arc<dyn ComfyApiPort>,
        random: Arc<dyn RandomPort>,
        session: Arc<GenerationSession>,
        poll: Arc<PollJobs>,
    ) -> Self {
        Self {
            comfy,
            random,
            session,
            poll,
        }
    }

    /// Submit the batch and poll until every job is done.
    pub async fn execute(&self) -> Result<GenerateOutcome, GenerateError> {
        let Some(guard) = self.session.try_begin() else {
            return Ok(GenerateOutcome::AlreadyRunning);
        };

        let submitted = self.submit_batch().await;
        if !matches!(submitted, Ok(GenerateOutcome::NoWorkflow)) {
            self.poll.execute().await;
        }
        drop(guard);
        submitted
    }

    /// Submit the batch and leave polling to a background task, which holds
    /// the generation slot until the queue drains.
    pub async fn start(&self) -> Result<GenerateOutcome, GenerateError> {
        let Some(guard) = self.session.try_begin() else {
            return Ok(GenerateOutcome::AlreadyRunning);
        };

        let submitted = self.submit_batch().await;
        if !matches!(submitted, Ok(GenerateOutcome::NoWorkflow)) {
            self.spawn_poller(guard);
        }
        submitted
    }

    fn spawn_poller(&self, guard: GenerationGuard) {
        let poll = Arc::clone(&self.poll);
        tokio::spawn(async move {
            poll.execute().await;
            drop(guard);
        });
    }

    async fn submit_batch(&self) -> Result<GenerateOutcome, GenerateError> {
        let batch_count = {
            let mut guard = self.session.lock().await;
            let state = &mut *guard;
            let Some(graph) = state.graph.as_mut() else {
                return Ok(GenerateOutcome::NoWorkflow);
            };
            // Whatever is left over from an earlier run has no poller; start fresh.
            state.pending.clear();
            let settings = &state.settings;

            if let Some(config) = &state.config {
                let required = [
                    ("positive", Value::from(settings.positive.clone())),
                    ("negative", Value::from(settings.negative.clone())),
                    ("checkpoint", Value::from(settings.checkpoint.clone())),
                ];
                for (id, value) in required {
                    let outcome = bind(graph, config, BindingCategory::Required, id, value);
                    tracing::debug!(setting = id, ?outcome, "Bound required setting");
                }

                for entry in &config.optional {
                    if let Some(value) = settings.get(&entry.id) {
                        let outcome = bind(graph, config, BindingCategory::Optional, &entry.id, value);
                        tracing::debug!(setting = %entry.id, ?outcome, "Bound optional setting");
                    }
                }
            } else {
                tracing::warn!("No workflow config loaded, submitting graph unchanged");
            }

            settings.batch_count
        };

        let mut prompt_ids = Vec::new();
        for unit in 0..batch_count {
            let seed = self.random.gen_range(0, SEED_RANGE);
            let graph = {
                let mut guard = self.session.lock().await;
                let state = &mut *guard;
                let Some(graph) = state.graph.as_mut() else {
                    break;
                };
                if let Some(config) = &state.config {
                    bind(graph, config, BindingCategory::Required, "seed", Value::from(seed));
                }
                graph.clone()
            };

            match self.comfy.submit_prompt(&graph).await {
                Ok(Some(prompt_id)) => {
                    tracing::info!(prompt_id = %prompt_id, seed, unit, "Prompt queued");
                    self.session.lock().await.pending.push(prompt_id.clone());
                    prompt_ids.push(prompt_id);
                }
                Ok(None) => {
                    tracing::warn!(unit, "Backend returned no prompt id, skipping");
                }
                Err(source) => {
                    tracing::error!(error = %source, unit, "Error in prompt request");
                    return Err(GenerateError::Submission {
                        submitted: prompt_ids,
                        source,
                    });
                }
            }
        }

        Ok(GenerateOutcome::Submitted { prompt_ids })
    }
}
