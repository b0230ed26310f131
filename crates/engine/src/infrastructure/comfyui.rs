//! ComfyUI backend client
//!
//! Implements the ComfyApiPort trait against ComfyUI's HTTP API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use comfydeck_domain::{HistoryEntry, PromptId, QueueSnapshot, WorkflowGraph};

use crate::infrastructure::ports::{ComfyApiPort, ComfyError};

/// Client for ComfyUI API
#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
}

impl ComfyUIClient {
    /// `timeout` of `None` leaves requests unbounded; generation can take a
    /// long time on slow hardware.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fail on non-success status, carrying the body text for the log.
    async fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response, ComfyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ComfyError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }

    async fn post_queue(&self, body: &QueueCommand<'_>) -> Result<(), ComfyError> {
        let response = self
            .client
            .post(self.url("/queue"))
            .json(body)
            .send()
            .await
            .map_err(|e| ComfyError::request("/queue", e))?;

        Self::ensure_success("/queue", response).await?;
        Ok(())
    }
}

#[async_trait]
impl ComfyApiPort for ComfyUIClient {
    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    async fn submit_prompt(&self, graph: &WorkflowGraph) -> Result<Option<PromptId>, ComfyError> {
        let request = QueuePromptRequest { prompt: graph };

        let response = self
            .client
            .post(self.url("/prompt"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ComfyError::request("/prompt", e))?;

        // ComfyUI rejects invalid graphs with a JSON body carrying
        // `node_errors` and no `prompt_id`; that is a skipped unit, not a
        // failed run.
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ComfyError::request("/prompt", e))?;
        let parsed: QueueResponse = serde_json::from_str(&text)
            .map_err(|e| ComfyError::invalid_response("/prompt", e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "ComfyUI rejected prompt");
        }

        Ok(parsed.prompt_id.filter(|id| !id.as_str().is_empty()))
    }

    async fn history(&self, prompt_id: &PromptId) -> Result<Option<HistoryEntry>, ComfyError> {
        let response = self
            .client
            .get(self.url(&format!("/history/{}", prompt_id)))
            .send()
            .await
            .map_err(|e| ComfyError::request("/history", e))?;

        let mut history: HashMap<String, HistoryEntry> = Self::ensure_success("/history", response)
            .await?
            .json()
            .await
            .map_err(|e| ComfyError::invalid_response("/history", e))?;

        Ok(history.remove(prompt_id.as_str()))
    }

    async fn queue(&self) -> Result<QueueSnapshot, ComfyError> {
        let response = self
            .client
            .get(self.url("/queue"))
            .send()
            .await
            .map_err(|e| ComfyError::request("/queue", e))?;

        Self::ensure_success("/queue", response)
            .await?
            .json()
            .await
            .map_err(|e| ComfyError::invalid_response("/queue", e))
    }

    async fn delete_from_queue(&self, prompt_ids: &[PromptId]) -> Result<(), ComfyError> {
        self.post_queue(&QueueCommand::Delete { delete: prompt_ids })
            .await
    }

    async fn clear_queue(&self) -> Result<(), ComfyError> {
        self.post_queue(&QueueCommand::Clear { clear: "" }).await
    }

    async fn object_info(&self) -> Result<Value, ComfyError> {
        let response = self
            .client
            .get(self.url("/object_info"))
            .send()
            .await
            .map_err(|e| ComfyError::request("/object_info", e))?;

        Self::ensure_success("/object_info", response)
            .await?
            .json()
            .await
            .map_err(|e| ComfyError::invalid_response("/object_info", e))
    }
}

// =============================================================================
// ComfyUI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct QueuePromptRequest<'a> {
    prompt: &'a WorkflowGraph,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    #[serde(default)]
    prompt_id: Option<PromptId>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum QueueCommand<'a> {
    Delete { delete: &'a [PromptId] },
    Clear { clear: &'a str },
}
