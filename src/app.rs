//! The run pipeline: config, token check, connect, calls, confirmation.

use std::io::Write;
use std::path::Path;

use crate::calls::{self, CALL_DEADLINE};
use crate::config::{self, Config};
use crate::connection::{self, Transport};
use crate::error::ClientError;

/// Printed once both calls have succeeded.
pub const SUCCESS_LINE: &str = "All RPC calls were successful";

/// Load the config at `config_path` and run against `host:50051`.
pub fn run<W: Write>(config_path: &Path, out: &mut W) -> Result<(), ClientError> {
    let config = config::load(config_path)?;
    tracing::debug!(path = %config_path.display(), host = %config.host, "config loaded");

    let addr = connection::endpoint(&config.host);
    execute(&config, &addr, out)
}

/// Run the call sequence for `config` against `addr`.
///
/// The token is checked before any connection is attempted. The connection
/// lives until this function returns.
pub fn execute<W: Write>(config: &Config, addr: &str, out: &mut W) -> Result<(), ClientError> {
    let token = config.require_token()?;
    let mut conn = connection::connect(addr)?;
    run_sequence(&mut conn, token, out)
}

/// Issue the default calls over `transport` and print the confirmation line.
pub fn run_sequence<T, W>(transport: &mut T, token: &str, out: &mut W) -> Result<(), ClientError>
where
    T: Transport + ?Sized,
    W: Write,
{
    calls::run_calls(transport, token, &calls::default_calls(), CALL_DEADLINE, out)?;
    writeln!(out, "{}", SUCCESS_LINE).map_err(ClientError::Output)
}
