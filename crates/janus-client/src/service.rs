use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SessionError;
use crate::response::EndpointsResponse;

/// Where a service should run: a replica count or explicit node names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instances {
    Count(u32),
    Nodes(Vec<String>),
}

impl From<u32> for Instances {
    fn from(n: u32) -> Self {
        Instances::Count(n)
    }
}

impl From<Vec<String>> for Instances {
    fn from(nodes: Vec<String>) -> Self {
        Instances::Nodes(nodes)
    }
}

impl From<&[&str]> for Instances {
    fn from(nodes: &[&str]) -> Self {
        Instances::Nodes(nodes.iter().map(|n| n.to_string()).collect())
    }
}

/// One container service request.
///
/// Deserializing accepts exactly the request shape sent to `/create`
/// (`instances`, `image`, `profile`, `kwargs`); anything else is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    #[serde(default)]
    instances: Option<Instances>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    kwargs: Map<String, Value>,
    #[serde(skip)]
    username: Option<String>,
    #[serde(skip)]
    public_key: Option<String>,
    #[serde(skip)]
    manifest: Option<Value>,
}

impl Service {
    pub fn new(instances: impl Into<Instances>, image: impl Into<String>) -> Self {
        Self {
            instances: Some(instances.into()),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// A service reconstructed from an active session listing
    pub fn with_manifest(manifest: Value) -> Self {
        Self {
            manifest: Some(manifest),
            ..Self::default()
        }
    }

    /// Validate a JSON request and turn it into a service
    pub fn from_request(value: Value) -> Result<Self, SessionError> {
        if !value.is_object() {
            return Err(SessionError::InvalidService(value.to_string()));
        }
        serde_json::from_value(value).map_err(|e| SessionError::InvalidService(e.to_string()))
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Injected into kwargs as `USER_NAME`
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Injected into kwargs as `PUBLIC_KEY`
    pub fn public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn manifest(&self) -> Option<&Value> {
        self.manifest.as_ref()
    }

    /// The `/create` request body entry for this service
    pub fn to_request(&self) -> Value {
        let mut kwargs = self.kwargs.clone();
        if let Some(user) = &self.username {
            kwargs.insert("USER_NAME".into(), Value::String(user.clone()));
        }
        if let Some(key) = &self.public_key {
            kwargs.insert("PUBLIC_KEY".into(), Value::String(key.clone()));
        }
        json!({
            "instances": self.instances,
            "image": self.image,
            "profile": self.profile,
            "kwargs": kwargs,
        })
    }

    /// Endpoints of this service, if it carries a manifest
    pub fn endpoints(&self) -> Option<EndpointsResponse> {
        self.manifest
            .as_ref()
            .map(|m| EndpointsResponse::from_manifests(std::iter::once(m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_request_injects_credentials() {
        let srv = Service::new(vec!["dtn-1".to_string()], "ubuntu:latest")
            .profile("default")
            .username("alice")
            .public_key("ssh-ed25519 AAAA")
            .kwarg("CTRL_PORT_RANGE", "30000-30100");

        let req = srv.to_request();
        assert_eq!(req["instances"], json!(["dtn-1"]));
        assert_eq!(req["image"], "ubuntu:latest");
        assert_eq!(req["profile"], "default");
        assert_eq!(req["kwargs"]["USER_NAME"], "alice");
        assert_eq!(req["kwargs"]["PUBLIC_KEY"], "ssh-ed25519 AAAA");
        assert_eq!(req["kwargs"]["CTRL_PORT_RANGE"], "30000-30100");
    }

    #[test]
    fn test_to_request_unset_fields_are_null() {
        let req = Service::default().to_request();
        assert!(req["instances"].is_null());
        assert!(req["profile"].is_null());
        assert_eq!(req["kwargs"], json!({}));
    }

    #[test]
    fn test_from_request_accepts_count_or_nodes() {
        let srv = Service::from_request(json!({"instances": 2, "image": "alpine"})).unwrap();
        assert_eq!(srv.to_request()["instances"], json!(2));

        let srv = Service::from_request(json!({
            "instances": ["a", "b"],
            "image": "alpine",
            "profile": "p",
            "kwargs": {"X": 1}
        }))
        .unwrap();
        assert_eq!(srv.to_request()["kwargs"]["X"], json!(1));
    }

    #[test]
    fn test_from_request_rejects_other_shapes() {
        assert!(matches!(
            Service::from_request(json!("ubuntu")),
            Err(SessionError::InvalidService(_))
        ));
        assert!(matches!(
            Service::from_request(json!({"image": "alpine", "replicas": 3})),
            Err(SessionError::InvalidService(_))
        ));
        assert!(matches!(
            Service::from_request(json!({"instances": "many"})),
            Err(SessionError::InvalidService(_))
        ));
    }

    #[test]
    fn test_endpoints_without_manifest() {
        assert!(Service::new(1u32, "alpine").endpoints().is_none());
    }
}
