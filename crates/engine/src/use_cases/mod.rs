//! Use cases - User story orchestration.
//!
//! Each module contains use cases for one area of the panel.
//! Use cases orchestrate ports and the session store.

pub mod generation;
pub mod settings;
pub mod workflow;

// Re-export main types
pub use generation::GenerationUseCases;
pub use settings::SettingsOps;
pub use workflow::WorkflowUseCases;
