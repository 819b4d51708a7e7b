//! token-rpc-client library
//!
//! Loads `config.json`, connects to the service at `host:50051`, and issues
//! two token-carrying calls in order. Exposes the stages for the binaries and
//! the integration tests.

pub mod app;
pub mod calls;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;

pub use error::{CallFailure, ClientError};
