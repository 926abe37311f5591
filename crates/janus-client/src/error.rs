#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("controller request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures raised by [`crate::Session`] lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("error during {operation}{}: {response}", target(.id))]
    Api {
        operation: &'static str,
        id: Option<String>,
        response: String,
    },

    #[error("not a valid service: {0}")]
    InvalidService(String),

    #[error("malformed controller response: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

fn target(id: &Option<String>) -> String {
    id.as_ref().map(|i| format!(" of {i}")).unwrap_or_default()
}

impl ClientError {
    pub(crate) fn conflicting(a: &str, b: &str) -> Self {
        ClientError::InvalidArgument(format!("specify either {a} or {b}, not both"))
    }
}
