//! Field binding: write a setting's value into the node input its config
//! entry points at.
//!
//! Binding never fails. A control without a config entry, or an entry whose
//! node is not in the graph, leaves the graph untouched and reports why.

use serde_json::Value;

use crate::ids::NodeKey;
use crate::workflow::config::{BindingCategory, NodeBinding, SearchType, WorkflowConfig};
use crate::workflow::graph::WorkflowGraph;

/// What a bind call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// `inputs[input]` of `node` was overwritten
    Bound { node: NodeKey, input: String },
    /// No config entry with that id in that category
    NoEntry,
    /// The entry's search rule matched no node
    NoNode,
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

/// Find the key of the node a binding targets. First match in lookup order.
pub fn find_node(graph: &WorkflowGraph, binding: &NodeBinding) -> Option<NodeKey> {
    if binding.search_type == SearchType::Id {
        let key = binding.search_value.as_key();
        return graph.get(&key).map(|_| NodeKey::new(key));
    }

    graph
        .keys_in_lookup_order()
        .into_iter()
        .find(|key| {
            graph.get(key.as_str()).is_some_and(|node| match binding.search_type {
                SearchType::ClassType => binding.search_value.matches_text(&node.class_type),
                SearchType::Title => node
                    .title()
                    .is_some_and(|title| binding.search_value.matches_text(title)),
                SearchType::Id => false,
            })
        })
        .cloned()
}

/// Bind `value` to the control `id` of `category`, mutating `graph` in place.
pub fn bind(
    graph: &mut WorkflowGraph,
    config: &WorkflowConfig,
    category: BindingCategory,
    id: &str,
    value: Value,
) -> BindOutcome {
    let Some(binding) = config.find_binding(category, id) else {
        return BindOutcome::NoEntry;
    };

    let Some(key) = find_node(graph, binding) else {
        return BindOutcome::NoNode;
    };

    match graph.get_mut(key.as_str()) {
        Some(node) => {
            node.set_input(&binding.input_name, value);
            BindOutcome::Bound {
                node: key,
                input: binding.input_name.clone(),
            }
        }
        None => BindOutcome::NoNode,
    }
}
