//! ComfyDeck domain: workflow graphs, their binding configs, generation
//! settings and backend job bookkeeping. No I/O lives here.

pub mod error;
pub mod ids;
pub mod jobs;
pub mod settings;
pub mod tags;
pub mod workflow;

pub use error::DomainError;

// Re-export ID types
pub use ids::{NodeKey, PromptId};

pub use jobs::{HistoryEntry, ImageRef, NodeOutput, PendingJobs, QueueSnapshot};
pub use settings::GenerationSettings;
pub use tags::TagIndex;

pub use workflow::{
    bind, find_node, BindOutcome, BindingCategory, BindingEntry, InputKind, InputSpec,
    ManifestPath, NodeBinding, NodeMeta, OptionalEntry, PathSegment, ResolvedOptions, SearchType,
    SearchValue, WorkflowConfig, WorkflowGraph, WorkflowNode, CHECKPOINT_ID,
    CHECKPOINT_LOADER_CLASS,
};
