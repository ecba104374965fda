use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Server configuration as returned by the config endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_version: Option<String>,
    /// Remaining settings, kept opaque
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The authenticated user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_system_auditor: bool,
}

/// Paged identity response; the current user is the first result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<User>,
}

/// Loaded console configuration: server settings plus the current user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    pub me: User,
}

/// Console API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Identity response contained no user")]
    EmptyIdentity,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) | ApiError::Decode(e) => e.status().map(|s| s.as_u16()),
            ApiError::EmptyIdentity => None,
        }
    }

    /// 401 responses mean the session is gone
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
