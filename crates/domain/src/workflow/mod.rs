//! Workflow templates and the binding engine.

pub mod binder;
pub mod config;
pub mod graph;
pub mod manifest;
pub mod object_info;

pub use binder::{bind, find_node, BindOutcome};
pub use config::{
    BindingCategory, BindingEntry, InputKind, InputSpec, NodeBinding, OptionalEntry, SearchType,
    SearchValue, WorkflowConfig,
};
pub use graph::{NodeMeta, WorkflowGraph, WorkflowNode};
pub use manifest::{ManifestPath, PathSegment};
pub use object_info::{ResolvedOptions, CHECKPOINT_ID, CHECKPOINT_LOADER_CLASS};
