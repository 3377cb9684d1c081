//! Entity gateway error types.

use thiserror::Error;

/// Errors that can occur while talking to the entity store.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The store could not be reached.
    #[error("Gateway connection error: {0}")]
    Connection(String),

    /// The store answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    /// Record not found.
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The store refused a write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Invalid gateway configuration: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Returns true if the error indicates a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Request {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            GatewayError::Connection(err.to_string())
        }
    }
}
