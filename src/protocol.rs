//! Wire types for the NDJSON call contract.
//!
//! Each request and response is a single JSON object followed by a newline.
//! Both the client and the stub service use these types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u8 = 1;

/// A request to the remote service.
///
/// Request format:
/// ```json
/// {"id": "uuid", "v": 1, "method": "...", "params": {"token": "..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier (echoed in response)
    pub id: String,
    /// Protocol version
    pub v: u8,
    /// Remote method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Request {
    /// Create a new request with the given method and parameters.
    pub fn new(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            v: PROTOCOL_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Create a request whose only parameter is the credential token.
    pub fn with_token(method: impl Into<String>, token: &str) -> Self {
        let mut params = Map::new();
        params.insert("token".to_string(), Value::String(token.to_string()));
        Self::new(method, params)
    }

    /// Token carried in `params`, if any.
    pub fn token(&self) -> Option<&str> {
        self.params.get("token").and_then(Value::as_str)
    }

    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

/// A response from the remote service.
///
/// Response format:
/// ```json
/// {"id": "uuid", "ok": true, "result": {...}, "error": null, "meta": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the request id
    pub id: String,
    /// Success flag
    pub ok: bool,
    /// Result payload (present when ok=true)
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload (present when ok=false)
    #[serde(default)]
    pub error: Option<ErrorPayload>,
    /// Metadata (timing, protocol version)
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Response {
    /// Create a success response.
    pub fn success(id: String, result: Value, server_ms: f64) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
            meta: Some(Meta::new(server_ms)),
        }
    }

    /// Create an error response.
    pub fn error(id: String, code: &str, message: String, server_ms: f64) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorPayload {
                code: code.to_string(),
                message,
                details: None,
            }),
            meta: Some(Meta::new(server_ms)),
        }
    }

    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

/// Error payload returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code (e.g., "UNKNOWN_METHOD", "ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(default)]
    pub details: Option<Value>,
}

/// Response metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Time spent processing on the server (milliseconds)
    pub server_ms: Option<f64>,
    /// Protocol version
    pub protocol_v: Option<u8>,
}

impl Meta {
    fn new(server_ms: f64) -> Self {
        Self {
            server_ms: Some(server_ms),
            protocol_v: Some(PROTOCOL_VERSION),
        }
    }
}
