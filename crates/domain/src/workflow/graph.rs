//! ComfyUI workflow graph (API format).
//!
//! A graph is a flat mapping from node key to node. Only `class_type`,
//! `inputs` and the `_meta.title` annotation are interpreted; every other
//! field is carried through untouched so the graph can be resubmitted as-is.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::NodeKey;

/// A single node in a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    #[serde(default)]
    pub class_type: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Editor annotations. ComfyUI writes `_meta`; `meta` is accepted too.
    #[serde(
        rename = "_meta",
        alias = "meta",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub meta: Option<NodeMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowNode {
    pub fn new(class_type: impl Into<String>) -> Self {
        Self {
            class_type: class_type.into(),
            inputs: Map::new(),
            meta: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta = Some(NodeMeta {
            title: title.into(),
            extra: Map::new(),
        });
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.title.as_str())
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Overwrite (or create) a named input.
    pub fn set_input(&mut self, name: &str, value: Value) {
        self.inputs.insert(name.to_string(), value);
    }
}

/// Workflow graph keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowGraph(BTreeMap<NodeKey, WorkflowNode>);

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, key: impl Into<NodeKey>, node: WorkflowNode) -> Self {
        self.0.insert(key.into(), node);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&WorkflowNode> {
        self.0.get(&NodeKey::from(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut WorkflowNode> {
        self.0.get_mut(&NodeKey::from(key))
    }

    /// Node keys in lookup order.
    ///
    /// Integer-like keys come first in ascending numeric order, the rest
    /// follow lexicographically. First-match searches walk this order.
    pub fn keys_in_lookup_order(&self) -> Vec<&NodeKey> {
        let mut keys: Vec<&NodeKey> = self.0.keys().collect();
        keys.sort_by(|a, b| lookup_order(a.as_str(), b.as_str()));
        keys
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, &WorkflowNode)> {
        self.0.iter()
    }

    /// Serialize into the JSON document the backend expects under `prompt`.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn lookup_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_comfyui_api_format() {
        let graph: WorkflowGraph = serde_json::from_value(json!({
            "4": {
                "inputs": { "ckpt_name": "sd15.safetensors" },
                "class_type": "CheckpointLoaderSimple",
                "_meta": { "title": "Load Checkpoint" }
            },
            "6": {
                "inputs": { "text": "a cat", "clip": ["4", 1] },
                "class_type": "CLIPTextEncode"
            }
        }))
        .unwrap();

        assert_eq!(graph.len(), 2);
        let loader = graph.get("4").unwrap();
        assert_eq!(loader.class_type, "CheckpointLoaderSimple");
        assert_eq!(loader.title(), Some("Load Checkpoint"));
        assert_eq!(graph.get("6").unwrap().title(), None);
    }

    #[test]
    fn accepts_meta_without_underscore() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "class_type": "CLIPTextEncode",
            "inputs": {},
            "meta": { "title": "Prompt" }
        }))
        .unwrap();
        assert_eq!(node.title(), Some("Prompt"));
    }

    #[test]
    fn preserves_unknown_fields_on_round_trip() {
        let original = json!({
            "3": {
                "inputs": { "seed": 1, "model": ["4", 0] },
                "class_type": "KSampler",
                "_meta": { "title": "Sampler", "color": "#333" },
                "is_changed": ["abc"]
            }
        });
        let graph: WorkflowGraph = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(graph.to_json(), original);
    }

    #[test]
    fn lookup_order_is_numeric_then_lexicographic() {
        let graph = WorkflowGraph::new()
            .with_node("10", WorkflowNode::new("A"))
            .with_node("9", WorkflowNode::new("B"))
            .with_node("alpha", WorkflowNode::new("C"))
            .with_node("2", WorkflowNode::new("D"));

        let keys: Vec<&str> = graph
            .keys_in_lookup_order()
            .into_iter()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["2", "9", "10", "alpha"]);
    }
}
