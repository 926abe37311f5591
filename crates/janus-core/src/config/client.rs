//! Client connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::opt_duration_secs;
use crate::types::ApiService;

/// Server address used when none is configured
pub const DEFAULT_URL: &str = "http://localhost:5000";

/// Default basic-auth user
pub const DEFAULT_USER: &str = "admin";

/// Default basic-auth password
pub const DEFAULT_PASSWORD: &str = "admin";

/// Connection settings for a controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address without the API prefix, e.g. `http://localhost:5000`
    pub url: String,

    /// Basic-auth user
    pub user: String,

    /// Basic-auth password
    pub password: String,

    /// Which controller API to address
    pub service: ApiService,

    /// Verify TLS certificates. Off by default, controllers commonly
    /// run with self-signed certificates.
    pub verify_tls: bool,

    /// Timeout for GET requests
    #[serde(
        with = "opt_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            service: ApiService::default(),
            verify_tls: false,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Full base URL including the service prefix
    pub fn base_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.service.prefix())
    }

    /// Whether the configured password is the stock default
    pub fn has_default_password(&self) -> bool {
        self.password == DEFAULT_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.base_url(),
            "http://localhost:5000/api/dtnaas/controller"
        );

        let config = ClientConfig {
            url: "https://ctl:5000/".to_string(),
            service: ApiService::Janus,
            ..ClientConfig::default()
        };
        assert_eq!(config.base_url(), "https://ctl:5000/api/janus/controller");
    }

    #[test]
    fn test_partial_toml() {
        let config: ClientConfig = toml::from_str("service = \"janus\"\ntimeout = 10").unwrap();
        assert_eq!(config.service, ApiService::Janus);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.url, DEFAULT_URL);
        assert!(!config.verify_tls);
    }

    #[test]
    fn test_has_default_password() {
        let mut config = ClientConfig::default();
        assert!(config.has_default_password());

        config.password = "s3cret".into();
        assert!(!config.has_default_password());
    }
}
