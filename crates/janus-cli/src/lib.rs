//! dtncli: interactive shell for the DTN-as-a-Service and Janus controllers
//!
//! Caches controller listings in a navigable config tree and exposes the
//! controller operations as shell commands.

pub mod commands;
pub mod nav;
pub mod output;
pub mod shell;
