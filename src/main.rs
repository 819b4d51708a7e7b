//! token-rpc-client - issue the two token calls and exit.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use token_rpc_client::{app, config};

/// Issue the user-info and user-attributes calls against the configured host.
#[derive(Parser, Debug)]
#[command(name = "token-rpc-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    match app::run(&cli.config, &mut stdout.lock()) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
