//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The ComfyUI backend (tests drive use cases against a mock)
//! - Workflow template storage (filesystem today)
//! - Settings persistence (JSON file today)
//! - Randomness (seeds, for testing)

mod error;
mod external;
mod testing;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{ComfyApiPort, SettingsRepo, WorkflowRepo};

#[cfg(test)]
pub use external::{MockComfyApiPort, MockSettingsRepo, MockWorkflowRepo};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::RandomPort;

#[cfg(test)]
pub use testing::MockRandomPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ComfyError, RepoError};
