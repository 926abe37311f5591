use serde_json::{Map, Value};
use std::fmt;
use std::ops::Deref;

use janus_core::types::scalar_string;
use janus_core::{Node, Profile};

use crate::service::Service;

/// A controller reply with its body read into memory.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub(crate) async fn read(resp: reqwest::Response) -> reqwest::Result<Self> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(Self { status, body })
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// True when the controller answered with a status above 400.
    ///
    /// A plain 400 is deliberately not counted.
    pub fn error(&self) -> bool {
        self.status > 400
    }

    /// Parse the body. An empty body yields `None`.
    pub fn json(&self) -> serde_json::Result<Option<Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body).map(Some)
    }

    fn json_array(&self) -> Option<Vec<Value>> {
        match self.json() {
            Ok(Some(Value::Array(items))) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.body)
    }
}

macro_rules! typed_response {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Response);

        impl $name {
            pub fn into_inner(self) -> Response {
                self.0
            }
        }

        impl From<Response> for $name {
            fn from(resp: Response) -> Self {
                Self(resp)
            }
        }

        impl Deref for $name {
            type Target = Response;

            fn deref(&self) -> &Response {
                &self.0
            }
        }
    };
}

typed_response!(
    /// Reply from `GET /nodes`; renders as one node name per line.
    NodeResponse
);

typed_response!(
    /// Reply from `GET /profiles`; renders as one profile name per line.
    ProfileResponse
);

typed_response!(
    /// Reply from `GET /active`; renders as one session id per line.
    ActiveResponse
);

fn names(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|n| n.get("name").map(scalar_string))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Identifier of an active listing entry.
///
/// Janus entries carry an `id` field; DTN-aaS entries are keyed by it.
fn entry_id(item: &Value) -> Option<String> {
    if let Some(id) = item.get("id") {
        return Some(scalar_string(id));
    }
    item.as_object()
        .and_then(|m| m.keys().next())
        .cloned()
}

impl NodeResponse {
    pub fn nodes(&self) -> serde_json::Result<Vec<Node>> {
        match self.json()? {
            Some(Value::Array(items)) => items.into_iter().map(serde_json::from_value).collect(),
            Some(single) => Ok(vec![serde_json::from_value(single)?]),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for NodeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.json_array() {
            Some(items) if !self.error() => f.write_str(&names(&items)),
            _ => fmt::Display::fmt(&self.0, f),
        }
    }
}

impl ProfileResponse {
    pub fn profiles(&self) -> serde_json::Result<Vec<Profile>> {
        match self.json()? {
            Some(Value::Array(items)) => items.into_iter().map(serde_json::from_value).collect(),
            Some(single) => Ok(vec![serde_json::from_value(single)?]),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for ProfileResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.json_array() {
            Some(items) if !self.error() => f.write_str(&names(&items)),
            _ => fmt::Display::fmt(&self.0, f),
        }
    }
}

impl ActiveResponse {
    /// Session ids in listing order
    pub fn ids(&self) -> Vec<String> {
        self.json_array()
            .unwrap_or_default()
            .iter()
            .filter_map(entry_id)
            .collect()
    }

    /// Each listed session as a manifest-carrying [`Service`]
    pub fn services(&self) -> serde_json::Result<Vec<(String, Service)>> {
        let items = match self.json()? {
            Some(Value::Array(items)) => items,
            Some(single) => vec![single],
            None => Vec::new(),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| entry_id(&item).map(|id| (id, Service::with_manifest(item))))
            .collect())
    }
}

impl fmt::Display for ActiveResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error() || self.json_array().is_none() {
            return fmt::Display::fmt(&self.0, f);
        }
        f.write_str(&self.ids().join("\n"))
    }
}

/// Flat mapping from service name to its control endpoint.
///
/// A service with errors appears only as `"<name> (Errors)"`, never also
/// under its plain name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointsResponse {
    entries: Vec<(String, String)>,
}

impl EndpointsResponse {
    /// Build from manifest entries shaped `{"services": {name: [instance, ..]}}`.
    pub fn from_manifests<'a, I>(manifests: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut eps = Self::default();
        for entry in manifests {
            let Some(services) = entry.get("services").and_then(Value::as_object) else {
                continue;
            };
            for (name, instances) in services {
                for inst in instances.as_array().into_iter().flatten() {
                    eps.record(name, inst);
                }
            }
        }
        eps
    }

    fn record(&mut self, name: &str, inst: &Value) {
        let err_key = format!("{name} (Errors)");
        match inst.get("errors").filter(|e| has_errors(e)) {
            Some(errors) => {
                self.entries.retain(|(k, _)| k != name);
                self.upsert(err_key, scalar_string(errors));
            }
            None => {
                if self.get(&err_key).is_none() {
                    let host = inst.get("ctrl_host").map(scalar_string).unwrap_or_default();
                    let port = inst.get("ctrl_port").map(scalar_string).unwrap_or_default();
                    self.upsert(name.to_string(), format!("{host}:{port}"));
                }
            }
        }
    }

    fn upsert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for EndpointsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&lines.join("\n"))
    }
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Per-session status collected from the controller
#[derive(Debug, Clone, Default)]
pub struct StatusResponse {
    entries: Vec<Value>,
}

impl StatusResponse {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    pub fn json(&self) -> &[Value] {
        &self.entries
    }
}

impl fmt::Display for StatusResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.entries {
            // Janus reports {"id", "services"}; DTN-aaS nests it under the id.
            let sessions: Vec<(String, &Value)> = match item.get("services") {
                Some(services) => vec![(entry_id(item).unwrap_or_default(), services)],
                None => item
                    .as_object()
                    .into_iter()
                    .flatten()
                    .filter_map(|(k, v)| v.get("services").map(|s| (k.clone(), s)))
                    .collect(),
            };
            for (id, services) in sessions {
                for (name, instances) in services.as_object().into_iter().flatten() {
                    for inst in instances.as_array().into_iter().flatten() {
                        let errors = inst.get("errors").map(scalar_string).unwrap_or_default();
                        writeln!(f, "id: {id}, service: {name}, errors: {errors}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
