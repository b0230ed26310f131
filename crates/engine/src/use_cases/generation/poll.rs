//! Job polling.

use std::sync::Arc;
use std::time::Duration;

use comfydeck_domain::{DomainError, HistoryEntry, PromptId};

use crate::infrastructure::ports::ComfyApiPort;
use crate::stores::GenerationSession;

/// What one history check did with the head job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Outputs arrived; the job was popped and its images added
    Completed { prompt_id: PromptId, images: usize },
    /// No outputs yet; the job stays at the head
    Waiting(PromptId),
    /// The lookup failed; the job was dropped
    Dropped(PromptId),
    /// Nothing pending
    Idle,
}

/// Drain the local job queue head first, one history check per interval.
///
/// There is no retry limit: a job stays at the head until the backend
/// reports outputs or the lookup fails.
pub struct PollJobs {
    comfy: Arc<dyn ComfyApiPort>,
    session: Arc<GenerationSession>,
    interval: Duration,
}

impl PollJobs {
    pub fn new(comfy: Arc<dyn ComfyApiPort>, session: Arc<GenerationSession>, interval: Duration) -> Self {
        Self {
            comfy,
            session,
            interval,
        }
    }

    /// Poll until the queue is empty.
    pub async fn execute(&self) {
        loop {
            if self.step().await == PollStep::Idle {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }
        tracing::debug!("Image generation monitoring completed");
    }

    /// Check the head job once.
    pub async fn step(&self) -> PollStep {
        let (prompt_id, output_node) = {
            let state = self.session.lock().await;
            let Some(head) = state.pending.head().cloned() else {
                return PollStep::Idle;
            };
            (head, state.config.as_ref().map(|c| c.output_node_id.clone()))
        };

        let entry = match self.comfy.history(&prompt_id).await {
            Ok(Some(entry)) if entry.has_outputs() => entry,
            Ok(_) => {
                tracing::trace!(prompt_id = %prompt_id, "No outputs yet, continuing to poll");
                return PollStep::Waiting(prompt_id);
            }
            Err(e) => {
                tracing::warn!(prompt_id = %prompt_id, error = %e, "Error monitoring image generation, dropping job");
                self.drop_job(&prompt_id).await;
                return PollStep::Dropped(prompt_id);
            }
        };

        match self.image_urls(&entry, output_node) {
            Ok(urls) => {
                let images = urls.len();
                let mut state = self.session.lock().await;
                if state.pending.complete(&prompt_id) {
                    for url in urls {
                        state.preview_images.insert(0, url);
                    }
                }
                tracing::info!(prompt_id = %prompt_id, images, remaining = state.pending.len(), "Job finished");
                PollStep::Completed { prompt_id, images }
            }
            Err(e) => {
                tracing::warn!(prompt_id = %prompt_id, error = %e, "Job outputs unusable, dropping job");
                self.drop_job(&prompt_id).await;
                PollStep::Dropped(prompt_id)
            }
        }
    }

    fn image_urls(
        &self,
        entry: &HistoryEntry,
        output_node: Option<comfydeck_domain::NodeKey>,
    ) -> Result<Vec<String>, DomainError> {
        let output_node = output_node.ok_or_else(|| {
            DomainError::MissingOutputNode("no workflow config loaded".to_string())
        })?;
        let endpoint = self.comfy.endpoint();
        Ok(entry
            .images_for(&output_node)?
            .unwrap_or_default()
            .iter()
            .map(|image| image.view_url(&endpoint))
            .collect())
    }

    async fn drop_job(&self, prompt_id: &PromptId) {
        let mut state = self.session.lock().await;
        state.pending.complete(prompt_id);
        tracing::debug!(remaining = state.pending.len(), "Removed prompt from queue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{ComfyError, MockComfyApiPort};
    use comfydeck_domain::WorkflowConfig;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> HistoryEntry {
        serde_json::from_value(value).unwrap()
    }

    async fn session_with(ids: &[&str]) -> Arc<GenerationSession> {
        let session = Arc::new(GenerationSession::new());
        {
            let mut state = session.lock().await;
            state.config = Some(WorkflowConfig::new("9"));
            for id in ids {
                state.pending.push(PromptId::new(*id));
            }
        }
        session
    }

    fn poller(comfy: MockComfyApiPort, session: &Arc<GenerationSession>) -> PollJobs {
        PollJobs::new(Arc::new(comfy), session.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn outputs_pop_head_and_prepend_view_urls() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://comfy:8188/".to_string());
        comfy.expect_history().returning(|_| {
            Ok(Some(entry(json!({"outputs": {"9": {"images": [
                {"filename": "a.png", "subfolder": "", "type": "output"},
                {"filename": "b.png", "subfolder": "", "type": "temp"}
            ]}}}))))
        });

        let session = session_with(&["p1", "p2"]).await;
        session.lock().await.preview_images.push("older".to_string());

        let step = poller(comfy, &session).step().await;
        assert_eq!(
            step,
            PollStep::Completed {
                prompt_id: PromptId::new("p1"),
                images: 2
            }
        );

        let state = session.lock().await;
        assert_eq!(state.pending.head(), Some(&PromptId::new("p2")));
        assert_eq!(
            state.preview_images,
            vec![
                "http://comfy:8188/view?filename=b.png&type=temp".to_string(),
                "http://comfy:8188/view?filename=a.png".to_string(),
                "older".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_outputs_keep_job_at_head() {
        let mut comfy = MockComfyApiPort::new();
        comfy
            .expect_history()
            .times(2)
            .returning(|_| Ok(Some(entry(json!({"status": {"completed": false}})))));

        let session = session_with(&["p1"]).await;
        let poller = poller(comfy, &session);

        assert_eq!(poller.step().await, PollStep::Waiting(PromptId::new("p1")));
        assert_eq!(poller.step().await, PollStep::Waiting(PromptId::new("p1")));
        assert_eq!(session.lock().await.pending.len(), 1);
    }

    #[tokio::test]
    async fn unknown_history_keeps_waiting() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_history().returning(|_| Ok(None));

        let session = session_with(&["p1"]).await;
        assert_eq!(
            poller(comfy, &session).step().await,
            PollStep::Waiting(PromptId::new("p1"))
        );
    }

    #[tokio::test]
    async fn lookup_error_drops_job() {
        let mut comfy = MockComfyApiPort::new();
        comfy
            .expect_history()
            .returning(|_| Err(ComfyError::invalid_response("/history", "expected value")));

        let session = session_with(&["p1", "p2"]).await;
        assert_eq!(
            poller(comfy, &session).step().await,
            PollStep::Dropped(PromptId::new("p1"))
        );
        assert_eq!(session.lock().await.pending.head(), Some(&PromptId::new("p2")));
    }

    #[tokio::test]
    async fn outputs_without_output_node_drop_job() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://comfy:8188".to_string());
        comfy
            .expect_history()
            .returning(|_| Ok(Some(entry(json!({"outputs": {"7": {"images": []}}})))));

        let session = session_with(&["p1"]).await;
        assert_eq!(
            poller(comfy, &session).step().await,
            PollStep::Dropped(PromptId::new("p1"))
        );
        assert!(session.lock().await.pending.is_empty());
    }

    #[tokio::test]
    async fn cancellation_during_lookup_is_respected() {
        let session = session_with(&["p1", "p2"]).await;

        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://comfy:8188".to_string());
        let during = session.clone();
        comfy.expect_history().returning(move |_| {
            // the queue is replaced while the lookup is in flight
            let mut state = during.try_lock().expect("session unlocked during lookup");
            state.pending.retain_only(PromptId::new("running"));
            Ok(Some(entry(json!({"outputs": {"9": {"images": []}}}))))
        });

        poller(comfy, &session).step().await;
        let state = session.lock().await;
        assert_eq!(state.pending.head(), Some(&PromptId::new("running")));
        assert_eq!(state.pending.len(), 1);
    }

    #[tokio::test]
    async fn execute_drains_queue() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://comfy:8188".to_string());
        let checks = std::sync::Mutex::new(0);
        comfy.expect_history().returning(move |_| {
            let mut n = checks.lock().unwrap();
            *n += 1;
            // first job needs two checks
            if *n == 1 {
                Ok(None)
            } else {
                Ok(Some(entry(json!({"outputs": {"9": {"images": [
                    {"filename": "x.png", "type": "output"}
                ]}}}))))
            }
        });

        let session = session_with(&["p1", "p2"]).await;
        poller(comfy, &session).execute().await;

        let state = session.lock().await;
        assert!(state.pending.is_empty());
        assert_eq!(state.preview_images.len(), 2);
    }
}
