//! Backend job bookkeeping: history records, queue snapshots, generated
//! image references and the local pending-job queue.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;
use crate::ids::{NodeKey, PromptId};

// =============================================================================
// Images
// =============================================================================

/// One image descriptor from a history output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// `output` for saved images, `temp` for previews
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ImageRef {
    pub fn new(filename: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            subfolder: String::new(),
            kind: kind.into(),
        }
    }

    pub fn is_temp(&self) -> bool {
        self.kind == "temp"
    }

    /// `{endpoint}/view?filename=<f>[&type=temp]`
    pub fn view_url(&self, endpoint: &str) -> String {
        let filename: String = url::form_urlencoded::byte_serialize(self.filename.as_bytes()).collect();
        let preview = if self.is_temp() { "&type=temp" } else { "" };
        format!(
            "{}/view?filename={}{}",
            endpoint.trim_end_matches('/'),
            filename,
            preview
        )
    }
}

// =============================================================================
// History
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Option<Vec<ImageRef>>,
}

/// One prompt's entry in `/history/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub outputs: Option<BTreeMap<String, NodeOutput>>,
}

impl HistoryEntry {
    pub fn has_outputs(&self) -> bool {
        self.outputs.is_some()
    }

    /// Images produced by `output_node`.
    ///
    /// Returns `Ok(None)` while the job has no outputs yet. Outputs that do
    /// not include the configured node are an error: the job finished but
    /// will never produce what we are waiting for.
    pub fn images_for(&self, output_node: &NodeKey) -> Result<Option<Vec<ImageRef>>, DomainError> {
        let Some(outputs) = &self.outputs else {
            return Ok(None);
        };
        let output = outputs
            .get(output_node.as_str())
            .ok_or_else(|| DomainError::MissingOutputNode(output_node.to_string()))?;
        Ok(Some(output.images.clone().unwrap_or_default()))
    }
}

// =============================================================================
// Backend queue
// =============================================================================

/// `/queue` response. Entries are arrays whose second element is the
/// prompt id; the rest of their shape is not relied on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub queue_running: Vec<Value>,
    #[serde(default)]
    pub queue_pending: Vec<Value>,
}

impl QueueSnapshot {
    /// Id of the job currently executing, if any.
    pub fn running_id(&self) -> Option<PromptId> {
        self.queue_running
            .first()
            .and_then(|entry| entry.as_array())
            .and_then(|items| items.get(1))
            .and_then(scalar_id)
    }

    /// Ids of every job still waiting. Bare (non-array) entries are taken
    /// as ids themselves.
    pub fn pending_ids(&self) -> Vec<PromptId> {
        self.queue_pending
            .iter()
            .filter_map(|entry| match entry {
                Value::Array(items) if items.len() >= 2 => scalar_id(&items[1]),
                Value::Array(_) => None,
                other => scalar_id(other),
            })
            .collect()
    }
}

fn scalar_id(value: &Value) -> Option<PromptId> {
    match value {
        Value::String(s) => Some(PromptId::new(s.clone())),
        Value::Number(n) => Some(PromptId::new(n.to_string())),
        _ => None,
    }
}

// =============================================================================
// Local pending queue
// =============================================================================

/// Jobs submitted by this session that have not reached a terminal state.
/// Checked head first; the pending count is the queue length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingJobs(VecDeque<PromptId>);

impl PendingJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: PromptId) {
        self.0.push_back(id);
    }

    pub fn head(&self) -> Option<&PromptId> {
        self.0.front()
    }

    /// Pop the head, but only if it is still `id`. A cancellation may have
    /// replaced the queue while `id` was being checked.
    pub fn complete(&mut self, id: &PromptId) -> bool {
        if self.0.front() == Some(id) {
            self.0.pop_front();
            true
        } else {
            false
        }
    }

    /// Collapse to just the running job.
    pub fn retain_only(&mut self, id: PromptId) {
        self.0.clear();
        self.0.push_back(id);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PromptId> {
        self.0.iter()
    }
}
