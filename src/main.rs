// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod bootstrap;
mod config;
mod logging;
mod monitor;
mod preflight;
mod supervisor;

#[cfg(test)]
mod test_helpers;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use api::{ApiState, HttpServer};
use bootstrap::Entrypoint;
use config::{APP_NAME, CONFIG_PATH_VAR, Config};
use logging::setup_logging;
use monitor::ResourceMonitor;
use preflight::PreflightRunner;
use supervisor::{HttpProbe, RestartPolicy, Supervisor};

/// Steam Games Downloader runtime: bootstrap, health service and supervisor
#[derive(Parser)]
#[command(name = "steam-downloader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = CONFIG_PATH_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the filesystem, run the checks, then exec into the server
    Entrypoint,

    /// Run the pre-flight checks and exit 0 when all pass
    Check,

    /// Run the HTTP service
    Serve,

    /// Probe the health endpoint once
    Probe {
        /// Health URL (default: derived from HOST and PORT)
        #[arg(long)]
        url: Option<String>,

        /// Request timeout in seconds (default: supervisor.timeout_secs)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Run a process under health probing and a restart policy
    Supervise {
        /// Override supervisor.restart
        #[arg(long, value_enum)]
        restart: Option<RestartPolicy>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let code = match cli.command {
        Commands::Entrypoint => run_entrypoint(&config).await?,
        Commands::Check => run_check(&config).await?,
        Commands::Serve => run_serve(&config).await?,
        Commands::Probe { url, timeout_secs } => run_probe(&config, url, timeout_secs).await?,
        Commands::Supervise { restart } => run_supervise(config, restart).await?,
    };

    Ok(exit_code(code))
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let path = path.to_string_lossy().into_owned();
            Config::load_with(|key| {
                if key == CONFIG_PATH_VAR {
                    Some(path.clone())
                } else {
                    std::env::var(key).ok()
                }
            })
        }
        None => Config::load(),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(0, 255) as u8)
}

async fn run_entrypoint(config: &Config) -> anyhow::Result<i32> {
    setup_logging(&config.log_filter(), None)?;

    let entrypoint = Entrypoint::from_config(config)?;
    // Only returns when the server was not started
    let code = entrypoint.run().await?;
    Ok(code)
}

async fn run_check(config: &Config) -> anyhow::Result<i32> {
    setup_logging(&config.log_filter(), None)?;

    let summary = PreflightRunner::from_config(config)?.run_all().await;
    for report in &summary.reports {
        let mark = if report.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", mark, report.name, report.detail);
    }
    Ok(summary.exit_code())
}

async fn run_serve(config: &Config) -> anyhow::Result<i32> {
    tokio::fs::create_dir_all(&config.log_dir).await?;
    setup_logging(&config.log_filter(), Some(&config.log_dir))?;

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", config.log_level);
    info!("Download path: {}", config.download_dir.display());

    let monitor = ResourceMonitor::new(
        config.download_dir.clone(),
        Duration::from_secs(config.health.sample_interval_secs),
    );
    let state = ApiState::new(monitor.latest(), config.health.resource_limit_percent);
    let monitor_task = monitor.spawn();

    let server = HttpServer::new(state, config.bind_addr().await?);
    let result = server.serve(shutdown_signal()).await;

    monitor_task.abort();

    match result {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(0)
        }
        Err(e) => {
            error!(error = %e, "HTTP server error");
            Err(e)
        }
    }
}

async fn run_probe(
    config: &Config,
    url: Option<String>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<i32> {
    let url = url.unwrap_or_else(|| config.health_url());
    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.supervisor.timeout());

    let probe = HttpProbe::new(url, timeout)?;
    match probe.check().await {
        Ok(()) => {
            println!("Application is healthy");
            Ok(0)
        }
        Err(e) => {
            println!("{}", e);
            Ok(1)
        }
    }
}

async fn run_supervise(mut config: Config, restart: Option<RestartPolicy>) -> anyhow::Result<i32> {
    setup_logging(&config.log_filter(), None)?;

    if let Some(policy) = restart {
        config.supervisor.restart = policy;
    }

    let supervisor = Supervisor::from_config(&config)?;
    let outcome = supervisor.run(shutdown_signal()).await?;

    info!(
        reason = %outcome.last_reason,
        restarts = outcome.restarts,
        "Supervisor exiting"
    );
    Ok(outcome.exit_code())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received shutdown signal (Ctrl+C)"),
        _ = terminate => info!("Received shutdown signal (SIGTERM)"),
    }
}
