//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod comfyui;
pub mod config;
pub mod images;
pub mod ports;
pub mod random;
pub mod settings;
pub mod tags;
pub mod workflows;
