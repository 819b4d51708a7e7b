//! token-rpc-stub - local stand-in for the remote service.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use token_rpc_client::server::StubServer;

#[derive(Parser)]
#[command(name = "token-rpc-stub")]
#[command(about = "Local stub service for token-rpc-client")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:50051")]
    bind: String,

    /// Delay every reply by this many milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let server = StubServer::bind(&cli.bind, Duration::from_millis(cli.delay_ms))?;
    server.serve()
}
