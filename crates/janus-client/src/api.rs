use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::response::{ActiveResponse, Response};

/// The controller operations a [`crate::Session`] drives.
///
/// [`crate::Client`] is the HTTP implementation; anything else that can
/// answer these calls (a recorded fixture, another transport) works too.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// Submit service requests, returning the allocated manifest
    async fn create(&self, requests: &[Value], name: Option<&str>) -> Result<Response>;

    /// Start an allocated session
    async fn start(&self, id: &str) -> Result<Response>;

    /// Stop a running session
    async fn stop(&self, id: &str) -> Result<Response>;

    /// Delete a session allocation
    async fn delete(&self, id: &str, force: bool) -> Result<Response>;

    /// List active sessions, or fetch one by id, user or name
    async fn active(&self, target: Option<&str>) -> Result<ActiveResponse>;
}
