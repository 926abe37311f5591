//! janus-core: Shared types and configuration for the Janus controller client
//!
//! This crate provides the domain types, configuration structures and error
//! types used by both the `janus-client` SDK and the `dtncli` shell.

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{ApiService, Node, Profile, ResourceType, SessionState};
