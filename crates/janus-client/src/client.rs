use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

use janus_core::config::ClientConfig;
use janus_core::ResourceType;

use crate::api::ControllerApi;
use crate::error::{ClientError, Result, SessionError};
use crate::response::{ActiveResponse, NodeResponse, ProfileResponse, Response};
use crate::session::Session;

/// Client for the controller REST API.
#[derive(Clone)]
pub struct Client {
    url: String,
    auth: Option<(String, String)>,
    timeout: Option<Duration>,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ClientError::InvalidArgument("server url is empty".into()));
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self {
            url: config.base_url(),
            auth: (!config.user.is_empty())
                .then(|| (config.user.clone(), config.password.clone())),
            timeout: config.timeout,
            http,
        })
    }

    /// Full base URL, service prefix included
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the full base URL (no prefix is appended)
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// A fresh, empty session bound to this client
    pub fn session(&self) -> Session<'_, Self> {
        Session::new(self)
    }

    /// A session seeded from an existing allocation
    pub async fn clone_session(
        &self,
        id: &str,
    ) -> std::result::Result<Session<'_, Self>, SessionError> {
        Session::clone_from(self, id).await
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.url, path);
        tracing::debug!(method = %method, url = %url, "controller request");

        let mut builder = self.http.request(method.clone(), &url);
        if let Some((user, password)) = &self.auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if method == Method::GET {
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
        }

        let resp = Response::read(builder.send().await?).await?;
        tracing::debug!(status = resp.status_code(), url = %url, "controller response");
        Ok(resp)
    }

    // ── Nodes ───────────────────────────────────────────────────────

    /// List nodes, or fetch one by name or id.
    ///
    /// `refresh` asks the controller to re-probe its nodes and only applies
    /// to the full listing.
    pub async fn nodes(
        &self,
        node: Option<&str>,
        node_id: Option<&str>,
        refresh: bool,
    ) -> Result<NodeResponse> {
        let (path, query) = match (node, node_id) {
            (Some(_), Some(_)) => return Err(ClientError::conflicting("node", "node_id")),
            (Some(target), None) | (None, Some(target)) => (format!("/nodes/{target}"), vec![]),
            (None, None) if refresh => ("/nodes".to_string(), vec![("refresh", "true".to_string())]),
            (None, None) => ("/nodes".to_string(), vec![]),
        };
        self.call(Method::GET, &path, &query, None).await.map(NodeResponse::from)
    }

    pub async fn add_node(&self, node: &Value) -> Result<Response> {
        self.call(Method::POST, "/nodes", &[], Some(node)).await
    }

    pub async fn delete_node(&self, node: Option<&str>, node_id: Option<&str>) -> Result<Response> {
        let target = match (node, node_id) {
            (Some(_), Some(_)) => return Err(ClientError::conflicting("node", "node_id")),
            (Some(target), None) | (None, Some(target)) => target,
            (None, None) => {
                return Err(ClientError::InvalidArgument(
                    "must specify either node name or node_id".into(),
                ))
            }
        };
        self.call(Method::DELETE, &format!("/nodes/{target}"), &[], None)
            .await
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// List active sessions, or fetch one by id, owning user or name
    pub async fn active(&self, target: Option<&str>) -> Result<ActiveResponse> {
        let path = match target {
            Some(t) => format!("/active/{t}"),
            None => "/active".to_string(),
        };
        self.call(Method::GET, &path, &[], None)
            .await
            .map(ActiveResponse::from)
    }

    /// Container logs for one node of a session (`stdout`, `stderr`, `tail`, ...)
    pub async fn active_logs(
        &self,
        id: &str,
        node: &str,
        params: &[(&str, String)],
    ) -> Result<Response> {
        self.call(Method::GET, &format!("/active/{id}/logs/{node}"), params, None)
            .await
    }

    pub async fn create(&self, requests: &[Value], name: Option<&str>) -> Result<Response> {
        let path = match name {
            Some(n) => format!("/create/{n}"),
            None => "/create".to_string(),
        };
        let body = Value::Array(requests.to_vec());
        self.call(Method::POST, &path, &[], Some(&body)).await
    }

    pub async fn delete(&self, id: &str, force: bool) -> Result<Response> {
        let query = if force {
            vec![("force", "true".to_string())]
        } else {
            vec![]
        };
        self.call(Method::DELETE, &format!("/active/{id}"), &query, None)
            .await
    }

    pub async fn start(&self, id: &str) -> Result<Response> {
        self.call(Method::PUT, &format!("/start/{id}"), &[], None).await
    }

    pub async fn stop(&self, id: &str) -> Result<Response> {
        self.call(Method::PUT, &format!("/stop/{id}"), &[], None).await
    }

    // ── Exec ────────────────────────────────────────────────────────

    pub async fn exec_create(&self, request: &Value) -> Result<Response> {
        self.call(Method::POST, "/exec", &[], Some(request)).await
    }

    pub async fn exec_status(&self, node: &str, exec_id: &str) -> Result<Response> {
        let query = [("node", node.to_string()), ("exec_id", exec_id.to_string())];
        self.call(Method::GET, "/exec", &query, None).await
    }

    // ── Images ──────────────────────────────────────────────────────

    pub async fn images(&self, name: Option<&str>) -> Result<Response> {
        let path = match name {
            Some(n) => format!("/images/{n}"),
            None => "/images".to_string(),
        };
        self.call(Method::GET, &path, &[], None).await
    }

    // ── Profiles ────────────────────────────────────────────────────

    pub async fn profiles(
        &self,
        resource: Option<ResourceType>,
        name: Option<&str>,
        refresh: bool,
    ) -> Result<ProfileResponse> {
        let path = match (resource, name) {
            (Some(r), Some(n)) => format!("/profiles/{r}/{n}"),
            (Some(r), None) => format!("/profiles/{r}"),
            (None, None) => "/profiles".to_string(),
            (None, Some(_)) => {
                return Err(ClientError::InvalidArgument(
                    "a profile name requires a resource type".into(),
                ))
            }
        };
        let query = if refresh {
            vec![("refresh", "true".to_string())]
        } else {
            vec![]
        };
        self.call(Method::GET, &path, &query, None)
            .await
            .map(ProfileResponse::from)
    }

    pub async fn create_profile(
        &self,
        resource: ResourceType,
        name: &str,
        settings: &Value,
    ) -> Result<Response> {
        let body = json!({ "settings": settings });
        self.call(Method::POST, &format!("/profiles/{resource}/{name}"), &[], Some(&body))
            .await
    }

    pub async fn update_profile(
        &self,
        resource: ResourceType,
        name: &str,
        settings: &Value,
    ) -> Result<Response> {
        let body = json!({ "settings": settings });
        self.call(Method::PUT, &format!("/profiles/{resource}/{name}"), &[], Some(&body))
            .await
    }

    pub async fn delete_profile(&self, resource: ResourceType, name: &str) -> Result<Response> {
        self.call(Method::DELETE, &format!("/profiles/{resource}/{name}"), &[], None)
            .await
    }

    // ── Authorization ───────────────────────────────────────────────

    /// Replace the users and groups allowed to use a resource
    pub async fn update_users(
        &self,
        resource_type: &str,
        resource: &str,
        users: &[String],
        groups: &[String],
    ) -> Result<Response> {
        let body = json!({ "users": users, "groups": groups });
        self.call(
            Method::POST,
            &format!("/auth/{resource_type}/{resource}"),
            &[],
            Some(&body),
        )
        .await
    }
}

#[async_trait]
impl ControllerApi for Client {
    async fn create(&self, requests: &[Value], name: Option<&str>) -> Result<Response> {
        Client::create(self, requests, name).await
    }

    async fn start(&self, id: &str) -> Result<Response> {
        Client::start(self, id).await
    }

    async fn stop(&self, id: &str) -> Result<Response> {
        Client::stop(self, id).await
    }

    async fn delete(&self, id: &str, force: bool) -> Result<Response> {
        Client::delete(self, id, force).await
    }

    async fn active(&self, target: Option<&str>) -> Result<ActiveResponse> {
        Client::active(self, target).await
    }
}
