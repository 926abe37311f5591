//! Core domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which controller API a client talks to.
///
/// Both flavours share the same resource layout and only differ in the
/// URL prefix they are mounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiService {
    /// DTN-as-a-Service controller
    #[default]
    Dtnaas,
    /// Janus controller
    Janus,
}

impl ApiService {
    /// URL prefix appended to the server address
    pub fn prefix(&self) -> &'static str {
        match self {
            ApiService::Dtnaas => "/api/dtnaas/controller",
            ApiService::Janus => "/api/janus/controller",
        }
    }
}

impl fmt::Display for ApiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiService::Dtnaas => write!(f, "dtnaas"),
            ApiService::Janus => write!(f, "janus"),
        }
    }
}

impl FromStr for ApiService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dtnaas" => Ok(ApiService::Dtnaas),
            "janus" => Ok(ApiService::Janus),
            other => Err(format!("unknown service '{}' (expected dtnaas or janus)", other)),
        }
    }
}

/// Resource kinds a profile can configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Container host settings (cpu, memory, privileged, ...)
    Host,
    /// Network settings (driver, ipv6, ...)
    Network,
    /// Volume settings (type, driver, source, target)
    Volume,
}

impl ResourceType {
    /// Path segment used by the profiles endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Host => "host",
            ResourceType::Network => "network",
            ResourceType::Volume => "volume",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(ResourceType::Host),
            "network" => Ok(ResourceType::Network),
            "volume" => Ok(ResourceType::Volume),
            other => Err(format!(
                "unknown resource type '{}' (expected host, network or volume)",
                other
            )),
        }
    }
}

/// Lifecycle state of a client-side session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Built locally, nothing sent to the controller yet
    Created,
    /// Requests submitted and a manifest allocated
    Initialized,
    /// Services running
    Started,
    /// Services stopped
    Stopped,
    /// Services disagree about their state
    Mixed,
    /// Allocation deleted on the controller
    Destroyed,
}

impl SessionState {
    /// Parse a state string reported by the controller.
    ///
    /// Matching is case-insensitive. Anything unrecognised is reported as
    /// [`SessionState::Mixed`].
    pub fn from_server(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => SessionState::Created,
            "INITIALIZED" => SessionState::Initialized,
            "STARTED" => SessionState::Started,
            "STOPPED" => SessionState::Stopped,
            "DESTROYED" => SessionState::Destroyed,
            _ => SessionState::Mixed,
        }
    }

    /// Fold per-service states into a single session state.
    ///
    /// Returns `None` for an empty iterator and `Mixed` if any two differ.
    pub fn combine<I: IntoIterator<Item = SessionState>>(states: I) -> Option<SessionState> {
        let mut iter = states.into_iter();
        let first = iter.next()?;
        if iter.all(|s| s == first) {
            Some(first)
        } else {
            Some(SessionState::Mixed)
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "CREATED",
            SessionState::Initialized => "INITIALIZED",
            SessionState::Started => "STARTED",
            SessionState::Stopped => "STOPPED",
            SessionState::Mixed => "MIXED",
            SessionState::Destroyed => "DESTROYED",
        };
        f.write_str(name)
    }
}

/// A remote execution host registered with the controller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Controller-assigned identifier (numeric on Janus)
    pub id: Option<Value>,
    /// Node name
    pub name: String,
    /// Management endpoint, e.g. `tcp://host:9001`
    pub url: Option<String>,
    /// Externally reachable address
    pub public_url: Option<String>,
    /// Endpoint type as reported by the controller
    #[serde(rename = "type")]
    pub node_type: Option<Value>,
}

impl Node {
    /// Identifier rendered for display (`-` when absent)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(scalar_string).unwrap_or_else(|| "-".to_string())
    }
}

/// A named settings bundle for one resource type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Profile name
    pub name: String,
    /// Resource-specific settings (cpu, memory, driver, ...)
    pub settings: Map<String, Value>,
}

/// Render a JSON scalar without quotes around strings
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
