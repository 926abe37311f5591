use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use janus_core::SessionState;

use crate::api::ControllerApi;
use crate::error::SessionError;
use crate::response::{EndpointsResponse, Response, StatusResponse};
use crate::service::Service;

type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy)]
enum Transition {
    Start,
    Stop,
}

impl Transition {
    fn name(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Stop => "stop",
        }
    }

    /// State assumed when the controller does not report one
    fn target(self) -> SessionState {
        match self {
            Transition::Start => SessionState::Started,
            Transition::Stop => SessionState::Stopped,
        }
    }
}

/// A client-side group of service requests and the allocations the
/// controller made for them.
///
/// A session is driven by one caller at a time. Batch operations walk the
/// manifest in order and stop at the first failure; entries already
/// handled are left as they are.
pub struct Session<'a, C: ControllerApi + ?Sized> {
    id: Uuid,
    client: &'a C,
    allocated: bool,
    requests: Vec<Value>,
    manifest: Map<String, Value>,
    state: SessionState,
}

impl<'a, C: ControllerApi + ?Sized> Session<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            allocated: false,
            requests: Vec::new(),
            manifest: Map::new(),
            state: SessionState::Created,
        }
    }

    /// Seed a session from an existing allocation on the controller
    pub async fn clone_from(client: &'a C, id: &str) -> SessionResult<Self> {
        let mut session = Self::new(client);
        let ret = client.active(Some(id)).await?;
        if ret.error() {
            return Err(SessionError::Api {
                operation: "clone",
                id: Some(id.to_string()),
                response: ret.to_string(),
            });
        }
        if let Some(value) = ret.json()? {
            session.seed(&value);
        }
        Ok(session)
    }

    /// Seed a session from an already fetched manifest
    pub fn from_manifest(client: &'a C, manifest: &Value) -> Self {
        let mut session = Self::new(client);
        session.seed(manifest);
        session
    }

    // Accepts a Janus entry ({"id", "request", ...}), a DTN-aaS entry
    // ({id: {"request", ...}}) or a list of either.
    fn seed(&mut self, value: &Value) {
        match value {
            Value::Array(items) => items.iter().for_each(|item| self.seed(item)),
            Value::Object(obj) if obj.contains_key("request") => {
                if let Some(id) = obj.get("id") {
                    let key = janus_core::types::scalar_string(id);
                    self.absorb(key, value);
                }
            }
            Value::Object(obj) => {
                for (key, entry) in obj {
                    if entry.get("request").is_some() {
                        self.absorb(key.clone(), entry);
                    }
                }
            }
            _ => {}
        }
    }

    fn absorb(&mut self, key: String, entry: &Value) {
        if let Some(requests) = entry.get("request").and_then(Value::as_array) {
            self.requests.extend(requests.iter().cloned());
        }
        self.manifest.insert(key, entry.clone());
        self.allocated = true;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn allocated(&self) -> bool {
        self.allocated
    }

    pub fn requests(&self) -> &[Value] {
        &self.requests
    }

    pub fn manifest(&self) -> &Map<String, Value> {
        &self.manifest
    }

    /// Queue a service request. Duplicates are not detected.
    pub fn add_service(&mut self, service: &Service) {
        self.requests.push(service.to_request());
    }

    /// Queue a service request given as raw JSON.
    ///
    /// Fails with [`SessionError::InvalidService`] unless the value has the
    /// shape of a service request.
    pub fn add_service_json(&mut self, value: Value) -> SessionResult<()> {
        let service = Service::from_request(value)?;
        self.add_service(&service);
        Ok(())
    }

    /// Submit all queued requests and record the returned manifest
    pub async fn initialize(&mut self) -> SessionResult<Response> {
        let ret = self.client.create(&self.requests, None).await?;
        if ret.error() {
            return Err(SessionError::Api {
                operation: "initialize",
                id: None,
                response: ret.to_string(),
            });
        }
        if let Some(Value::Object(allocations)) = ret.json()? {
            self.manifest.extend(allocations);
        }
        self.allocated = true;
        self.state = SessionState::Initialized;
        tracing::info!(session = %self.id, entries = self.manifest.len(), "session initialized");
        Ok(ret)
    }

    /// Start every allocation, initializing first if nothing was submitted yet
    pub async fn start(&mut self) -> SessionResult<SessionState> {
        if self.state == SessionState::Created {
            self.initialize().await?;
        }
        self.transition(Transition::Start).await
    }

    /// Stop every allocation
    pub async fn stop(&mut self) -> SessionResult<SessionState> {
        self.transition(Transition::Stop).await
    }

    async fn transition(&mut self, op: Transition) -> SessionResult<SessionState> {
        let ids: Vec<String> = self.manifest.keys().cloned().collect();
        let mut reached = Vec::with_capacity(ids.len());

        for id in ids {
            let ret = match op {
                Transition::Start => self.client.start(&id).await,
                Transition::Stop => self.client.stop(&id).await,
            };
            let ret = match ret {
                Ok(ret) => ret,
                Err(e) => {
                    self.settle_partial(&reached);
                    return Err(e.into());
                }
            };
            if ret.error() {
                self.settle_partial(&reached);
                return Err(SessionError::Api {
                    operation: op.name(),
                    id: Some(id),
                    response: ret.to_string(),
                });
            }

            let body = match ret.json() {
                Ok(body) => body,
                Err(e) => {
                    self.settle_partial(&reached);
                    return Err(e.into());
                }
            };
            let reported = match body {
                Some(Value::Object(update)) => {
                    let state = update
                        .get(&id)
                        .and_then(|entry| entry.get("state"))
                        .and_then(Value::as_str)
                        .map(SessionState::from_server);
                    self.manifest.extend(update);
                    state
                }
                _ => None,
            };
            reached.push(reported.unwrap_or(op.target()));
        }

        if let Some(state) = SessionState::combine(reached) {
            self.state = state;
        }
        tracing::info!(session = %self.id, state = %self.state, "session {}", op.name());
        Ok(self.state)
    }

    fn settle_partial(&mut self, reached: &[SessionState]) {
        if !reached.is_empty() {
            self.state = SessionState::Mixed;
        }
    }

    /// Delete every allocation on the controller
    pub async fn destroy(&mut self) -> SessionResult<()> {
        let ids: Vec<String> = self.manifest.keys().cloned().collect();
        let mut deleted = 0usize;

        for id in ids {
            let ret = match self.client.delete(&id, false).await {
                Ok(ret) => ret,
                Err(e) => {
                    if deleted > 0 {
                        self.state = SessionState::Mixed;
                    }
                    return Err(e.into());
                }
            };
            if ret.error() {
                if deleted > 0 {
                    self.state = SessionState::Mixed;
                }
                return Err(SessionError::Api {
                    operation: "destroy",
                    id: Some(id),
                    response: ret.to_string(),
                });
            }
            deleted += 1;
        }

        self.allocated = false;
        self.state = SessionState::Destroyed;
        tracing::info!(session = %self.id, "session destroyed");
        Ok(())
    }

    /// Current controller view of every allocation
    pub async fn status(&self) -> SessionResult<StatusResponse> {
        let mut entries = Vec::with_capacity(self.manifest.len());
        for id in self.manifest.keys() {
            if let Some(value) = self.client.active(Some(id.as_str())).await?.json()? {
                entries.push(value);
            }
        }
        Ok(StatusResponse::new(entries))
    }

    /// Control endpoint of every service in the manifest
    pub fn endpoints(&self) -> EndpointsResponse {
        EndpointsResponse::from_manifests(self.manifest.values())
    }
}

impl<C: ControllerApi + ?Sized> fmt::Display for Session<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}\nallocated: {}\nrequests: {}\nmanifest: {}\nstate: {}",
            self.id,
            self.allocated,
            Value::Array(self.requests.clone()),
            Value::Object(self.manifest.clone()),
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ClientResult;
    use crate::response::ActiveResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted controller: replies keyed by "op:id", 200 "{}" otherwise
    #[derive(Default)]
    struct FakeController {
        replies: HashMap<String, Response>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeController {
        fn reply(self, key: &str, status: u16, body: Value) -> Self {
            self.reply_raw(key, status, &body.to_string())
        }

        fn reply_raw(mut self, key: &str, status: u16, body: &str) -> Self {
            self.replies
                .insert(key.to_string(), Response::new(status, body));
            self
        }

        fn answer(&self, key: String) -> Response {
            let resp = self
                .replies
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Response::new(200, "{}"));
            self.calls.lock().unwrap().push(key);
            resp
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControllerApi for FakeController {
        async fn create(&self, _requests: &[Value], _name: Option<&str>) -> ClientResult<Response> {
            Ok(self.answer("create".into()))
        }

        async fn start(&self, id: &str) -> ClientResult<Response> {
            Ok(self.answer(format!("start:{id}")))
        }

        async fn stop(&self, id: &str) -> ClientResult<Response> {
            Ok(self.answer(format!("stop:{id}")))
        }

        async fn delete(&self, id: &str, _force: bool) -> ClientResult<Response> {
            Ok(self.answer(format!("delete:{id}")))
        }

        async fn active(&self, target: Option<&str>) -> ClientResult<ActiveResponse> {
            Ok(self
                .answer(format!("active:{}", target.unwrap_or_default()))
                .into())
        }
    }

    fn three_entries() -> Value {
        json!({
            "1": {"request": [], "services": {}},
            "2": {"request": [], "services": {}},
            "3": {"request": [], "services": {}}
        })
    }

    #[tokio::test]
    async fn test_start_from_created_initializes_first() {
        let fake = FakeController::default()
            .reply("create", 200, json!({"12": {"services": {}}}))
            .reply("start:12", 200, json!({"12": {"state": "STARTED", "services": {}}}));
        let mut session = Session::new(&fake);
        session.add_service(&Service::new(1u32, "ubuntu:latest"));

        let state = session.start().await.unwrap();

        assert_eq!(state, SessionState::Started);
        assert!(session.allocated());
        assert_eq!(fake.calls(), vec!["create", "start:12"]);
    }

    #[tokio::test]
    async fn test_initialize_then_start_skips_create() {
        let fake = FakeController::default().reply("create", 200, json!({"4": {}}));
        let mut session = Session::new(&fake);

        session.initialize().await.unwrap();
        assert_eq!(session.state(), SessionState::Initialized);

        session.start().await.unwrap();
        assert_eq!(fake.calls(), vec!["create", "start:4"]);
        assert_eq!(session.state(), SessionState::Started);
    }

    #[tokio::test]
    async fn test_initialize_error_leaves_session_untouched() {
        let fake = FakeController::default().reply("create", 500, json!({"error": "no nodes"}));
        let mut session = Session::new(&fake);

        let err = session.initialize().await.unwrap_err();

        assert!(matches!(err, SessionError::Api { operation: "initialize", .. }));
        assert_eq!(session.state(), SessionState::Created);
        assert!(session.manifest().is_empty());
    }

    #[tokio::test]
    async fn test_stop_aborts_at_first_error_without_rollback() {
        let fake = FakeController::default().reply("stop:2", 503, json!("busy"));
        let mut session = Session::from_manifest(&fake, &three_entries());

        let err = session.stop().await.unwrap_err();

        match err {
            SessionError::Api { operation, id, .. } => {
                assert_eq!(operation, "stop");
                assert_eq!(id.as_deref(), Some("2"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fake.calls(), vec!["stop:1", "stop:2"]);
        assert_eq!(session.state(), SessionState::Mixed);
    }

    #[tokio::test]
    async fn test_heterogeneous_states_are_mixed() {
        let fake = FakeController::default()
            .reply("start:1", 200, json!({"1": {"state": "STARTED"}}))
            .reply("start:2", 200, json!({"2": {"state": "STOPPED"}}))
            .reply("start:3", 200, json!({"3": {"state": "STARTED"}}));
        let mut session = Session::from_manifest(&fake, &three_entries());

        assert_eq!(session.start().await.unwrap(), SessionState::Mixed);
    }

    #[tokio::test]
    async fn test_destroy_deletes_every_entry() {
        let fake = FakeController::default();
        let mut session = Session::from_manifest(&fake, &three_entries());

        session.destroy().await.unwrap();

        assert_eq!(fake.calls(), vec!["delete:1", "delete:2", "delete:3"]);
        assert_eq!(session.state(), SessionState::Destroyed);
        assert!(!session.allocated());
    }

    #[tokio::test]
    async fn test_malformed_reply_mid_batch_is_mixed() {
        let fake = FakeController::default()
            .reply("create", 200, json!({"1": {}, "2": {}}))
            .reply("start:1", 200, json!({"1": {"state": "STARTED"}}))
            .reply_raw("start:2", 200, "{not json");
        let mut session = Session::new(&fake);
        session.initialize().await.unwrap();

        let err = session.start().await.unwrap_err();

        assert!(matches!(err, SessionError::Json(_)));
        assert_eq!(fake.calls(), vec!["create", "start:1", "start:2"]);
        assert_eq!(session.manifest()["1"]["state"], "STARTED");
        assert_eq!(session.state(), SessionState::Mixed);
    }

    #[tokio::test]
    async fn test_destroy_aborts_at_first_error() {
        let fake = FakeController::default().reply("delete:2", 500, json!({"error": "busy"}));
        let mut session = Session::from_manifest(&fake, &three_entries());

        let err = session.destroy().await.unwrap_err();

        assert!(matches!(err, SessionError::Api { operation: "destroy", .. }));
        assert_eq!(fake.calls(), vec!["delete:1", "delete:2"]);
        assert_eq!(session.state(), SessionState::Mixed);
        assert!(session.allocated());
    }

    #[tokio::test]
    async fn test_clone_from_janus_entry() {
        let fake = FakeController::default().reply(
            "active:9",
            200,
            json!({"id": 9, "request": [{"image": "alpine"}], "services": {}}),
        );

        let session = Session::clone_from(&fake, "9").await.unwrap();

        assert_eq!(session.requests().len(), 1);
        assert!(session.manifest().contains_key("9"));
    }

    #[tokio::test]
    async fn test_clone_from_dtnaas_listing() {
        let fake = FakeController::default().reply(
            "active:ab",
            200,
            json!([{"ab": {"request": [{"image": "a"}, {"image": "b"}], "services": {}}}]),
        );

        let session = Session::clone_from(&fake, "ab").await.unwrap();

        assert_eq!(session.requests().len(), 2);
        assert_eq!(session.manifest().keys().collect::<Vec<_>>(), vec!["ab"]);
    }

    #[test]
    fn test_add_service_json_rejects_non_service() {
        let fake = FakeController::default();
        let mut session = Session::new(&fake);

        let err = session.add_service_json(json!(["not", "a", "service"])).unwrap_err();

        assert!(matches!(err, SessionError::InvalidService(_)));
        assert!(session.requests().is_empty());

        session
            .add_service_json(json!({"instances": 1, "image": "alpine"}))
            .unwrap();
        session
            .add_service_json(json!({"instances": 1, "image": "alpine"}))
            .unwrap();
        assert_eq!(session.requests().len(), 2);
    }

    #[test]
    fn test_endpoints_from_manifest() {
        let fake = FakeController::default();
        let manifest = json!({
            "7": {
                "request": [],
                "services": {
                    "web": [{"errors": [], "ctrl_host": "10.1.1.1", "ctrl_port": 30000}],
                    "db": [{"errors": ["image missing"]}]
                }
            }
        });
        let session = Session::from_manifest(&fake, &manifest);

        let eps = session.endpoints();
        assert_eq!(eps.get("web"), Some("10.1.1.1:30000"));
        assert!(eps.get("db").is_none());
        assert!(eps.get("db (Errors)").is_some());
    }

    #[tokio::test]
    async fn test_status_queries_each_entry() {
        let fake = FakeController::default().reply(
            "active:1",
            200,
            json!({"id": 1, "services": {"web": [{"errors": []}]}}),
        );
        let manifest = json!({"1": {"request": []}});
        let session = Session::from_manifest(&fake, &manifest);

        let status = session.status().await.unwrap();

        assert_eq!(status.to_string(), "id: 1, service: web, errors: []\n");
    }
}
