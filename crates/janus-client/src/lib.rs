//! Typed Rust client for the Janus and DTN-as-a-Service controller APIs.
//!
//! Covers nodes, active sessions (create, start, stop, delete, logs),
//! profiles, images, exec and resource authorization. Responses are
//! wrapped rather than decoded eagerly so callers can inspect the status
//! before deciding how to read the body.
//!
//! On top of the raw client, [`Session`] tracks a set of [`Service`]
//! requests through create → start → stop → destroy.

mod api;
mod client;
mod error;
mod response;
mod service;
mod session;

pub use api::ControllerApi;
pub use client::Client;
pub use error::{ClientError, Result, SessionError};
pub use response::{
    ActiveResponse, EndpointsResponse, NodeResponse, ProfileResponse, Response, StatusResponse,
};
pub use service::{Instances, Service};
pub use session::Session;

pub use janus_core::{ApiService, ResourceType, SessionState};
