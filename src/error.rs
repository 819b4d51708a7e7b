//! Error type shared by every stage of a run.

use thiserror::Error;

/// Errors that can stop a run. All of them are fatal.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("could not open config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not unmarshal config data: {0}")]
    ConfigParse(#[source] serde_json::Error),

    #[error("API token is missing")]
    MissingCredential,

    #[error("did not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{method}: deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded { method: String, deadline_ms: u128 },

    #[error("{method}: {reason}")]
    Call {
        method: String,
        #[source]
        reason: CallFailure,
    },

    #[error("could not write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Underlying cause of a failed call.
#[derive(Error, Debug)]
pub enum CallFailure {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("connection closed before a response arrived")]
    EmptyResponse,

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },
}

impl ClientError {
    pub(crate) fn call(method: &str, reason: impl Into<CallFailure>) -> Self {
        ClientError::Call {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}
