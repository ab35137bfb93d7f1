use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use detector::{ConnectivityDetector, DetectorConfig, DetectorEvent};
use shared::state::{NetworkKind, NetworkSignal};
use tokio::sync::broadcast;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod settings;

use settings::load_settings;

#[derive(Parser, Debug)]
#[command(
    name = "netwatch",
    about = "Verify actual Internet reachability with generate-204 probes"
)]
struct Cli {
    /// Settings file; defaults to ./netwatch.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the primary probe URL.
    #[arg(long, global = true)]
    probe_url: Option<String>,
    /// Override the fallback probe URL.
    #[arg(long, global = true)]
    fallback_url: Option<String>,
    /// Override the per-probe timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one evaluation round; exits 0 only if the connection validated.
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Stream connection state transitions until interrupted.
    Watch {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("netwatch=info,detector=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.probe_url {
        settings.probe_url = url;
    }
    if let Some(url) = cli.fallback_url {
        settings.fallback_url = url;
    }
    if let Some(ms) = cli.timeout_ms {
        settings.probe_timeout_ms = ms;
    }
    let config = settings.into_detector_config()?;

    match cli.command {
        Command::Check { json } => check(config, json).await,
        Command::Watch { json } => watch(config, json).await,
    }
}

async fn check(config: DetectorConfig, json: bool) -> Result<ExitCode> {
    let detector = ConnectivityDetector::spawn(config)?;
    let state = detector.check_now().await?;
    detector.shutdown().await;

    if json {
        println!("{}", serde_json::json!({ "state": state }));
    } else {
        println!("{state}");
    }
    Ok(if state.is_online() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn watch(config: DetectorConfig, json: bool) -> Result<ExitCode> {
    let detector = ConnectivityDetector::spawn(config)?;
    let mut events = detector.subscribe();
    // No platform link signal is wired in; assume the link is up and let the
    // probes find out what it is worth.
    detector
        .network_changed(NetworkSignal::Online(NetworkKind::Other))
        .await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else {
                        let DetectorEvent::StateChanged { previous, current, at } = &event;
                        println!("{}  {previous} -> {current}", at.to_rfc3339());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dropped state transitions");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    detector.shutdown().await;
    Ok(ExitCode::SUCCESS)
}
