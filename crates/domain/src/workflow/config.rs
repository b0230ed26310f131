//! Workflow configuration schema.
//!
//! Each workflow template ships with a YAML companion that maps the settings
//! a user can edit onto concrete node inputs of the graph:
//!
//! ```yaml
//! output_node_id: 9
//! required:
//!   - id: positive
//!     workflow: { search_type: title, search_value: Prompt, input_name: text }
//! optional:
//!   - id: steps
//!     workflow: { search_type: class_type, search_value: KSampler, input_name: steps }
//!     input: { title: Steps, type: number, default: 20 }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::NodeKey;
use crate::workflow::manifest::ManifestPath;

/// Which config list an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingCategory {
    Required,
    Optional,
}

impl fmt::Display for BindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::Optional => f.write_str("optional"),
        }
    }
}

/// How a binding finds its target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    ClassType,
    Id,
    Title,
}

/// Search value as written in the config (YAML allows bare integers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchValue {
    Number(i64),
    Text(String),
}

impl SearchValue {
    /// Textual form, used for key comparisons.
    pub fn as_key(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Strict text equality: a numeric search value never matches a
    /// class type or title.
    pub fn matches_text(&self, candidate: &str) -> bool {
        matches!(self, Self::Text(s) if s == candidate)
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for SearchValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Where a setting is written inside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBinding {
    pub search_type: SearchType,
    pub search_value: SearchValue,
    pub input_name: String,
}

/// A `required` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingEntry {
    pub id: String,
    pub workflow: NodeBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    List,
    Text,
    Number,
}

/// UI description of an optional setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    /// Path into the object-info manifest for list inputs.
    #[serde(
        default,
        deserialize_with = "deserialize_manifest_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<ManifestPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// An `optional` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalEntry {
    pub id: String,
    pub workflow: NodeBinding,
    pub input: InputSpec,
}

/// Configuration paired with a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub output_node_id: NodeKey,
    #[serde(default)]
    pub required: Vec<BindingEntry>,
    #[serde(default)]
    pub optional: Vec<OptionalEntry>,
}

impl WorkflowConfig {
    pub fn new(output_node_id: impl Into<NodeKey>) -> Self {
        Self {
            output_node_id: output_node_id.into(),
            required: Vec::new(),
            optional: Vec::new(),
        }
    }

    pub fn with_required(mut self, id: impl Into<String>, workflow: NodeBinding) -> Self {
        self.required.push(BindingEntry {
            id: id.into(),
            workflow,
        });
        self
    }

    pub fn with_optional(
        mut self,
        id: impl Into<String>,
        workflow: NodeBinding,
        input: InputSpec,
    ) -> Self {
        self.optional.push(OptionalEntry {
            id: id.into(),
            workflow,
            input,
        });
        self
    }

    /// Look up the binding for a control id. First entry with the id wins.
    pub fn find_binding(&self, category: BindingCategory, id: &str) -> Option<&NodeBinding> {
        match category {
            BindingCategory::Required => self
                .required
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| &entry.workflow),
            BindingCategory::Optional => self
                .optional
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| &entry.workflow),
        }
    }
}

impl NodeBinding {
    pub fn new(
        search_type: SearchType,
        search_value: impl Into<SearchValue>,
        input_name: impl Into<String>,
    ) -> Self {
        Self {
            search_type,
            search_value: search_value.into(),
            input_name: input_name.into(),
        }
    }
}

// Anything that is not a list is treated as "no manifest path".
fn deserialize_manifest_path<'de, D>(deserializer: D) -> Result<Option<ManifestPath>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(ManifestPath::from_value))
}
