//! Network configuration types for the notes server.

use std::time::Duration;

use crate::service::context::DEFAULT_REQUEST_TIMEOUT;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Deadline attached to every request.
    pub request_timeout: Duration,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: 1_048_576, // 1 MiB
        }
    }
}
