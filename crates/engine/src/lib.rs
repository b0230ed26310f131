//! ComfyDeck Engine library.
//!
//! This crate contains the server side of the ComfyDeck control panel.
//!
//! ## Structure
//!
//! - `stores/` - Shared generation session state
//! - `use_cases/` - Workflow loading, settings and generation runs
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
