//! In-memory state storage modules.
//!
//! Stores manage runtime state that is not persisted:
//! - `GenerationSession` - loaded workflow, settings, gallery and job queue

pub mod session;

// Re-export store types
pub use session::{GenerationGuard, GenerationSession, SessionSnapshot, SessionState};
