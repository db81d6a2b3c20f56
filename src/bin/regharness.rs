use std::time::Duration;

use clap::{Parser, Subcommand};

use regharness::testutil::{find_free_local_port, wait_http, wait_tcp};
use regharness::HarnessConfig;

/// Harness helpers for scripts that boot a registry under test.
#[derive(Debug, Parser)]
#[command(name = "regharness", version, about)]
struct Cli {
    /// Override REGHARNESS_READY_TIMEOUT (e.g. `10s`).
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a currently free port on the listen host.
    FreePort {
        #[arg(long)]
        host: Option<String>,
    },
    /// Wait until HOST:PORT accepts TCP connections.
    WaitTcp { addr: String },
    /// Wait until URL answers with a non-5xx status.
    WaitHttp { url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = HarnessConfig::from_env()?;
    if let Some(timeout) = cli.timeout {
        config = config.with_ready_timeout(timeout);
    }

    match cli.command {
        Command::FreePort { host } => {
            let host = host.unwrap_or_else(|| config.listen_host.clone());
            println!("{}", find_free_local_port(&host)?);
        }
        Command::WaitTcp { addr } => wait_tcp(&addr, &config).await?,
        Command::WaitHttp { url } => {
            let status = wait_http(&url, &config).await?;
            println!("{}", status.as_u16());
        }
    }

    Ok(())
}
