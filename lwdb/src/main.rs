// lwdb - debug a Java program line by line from the terminal

use anyhow::{Context, Result};
use clap::Parser;
use lwdb::console::StdConsole;
use lwdb::{launcher, Args, Session, SessionEnd};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "lwdb=warn,jdwp_client=warn";

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing to stderr only - stdout is the operator console
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let target = launcher::start_target(&args)
        .await
        .with_context(|| format!("cannot debug {}", args.main_class))?;

    let mut session = Session::new(target, StdConsole::new(), args.main_class.clone());
    let end = session.start().await?;

    match end {
        SessionEnd::Disconnected | SessionEnd::ConnectionLost => info!("Target finished"),
        SessionEnd::OperatorExit => info!("Operator left the session"),
    }

    Ok(())
}
