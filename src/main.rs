//! Sunshine Recorder - start and stop OBS recordings as Moonlight clients
//! connect to Sunshine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sunshine_recorder::config::{BridgeConfig, ConfigError, ConfigLoader, RunOverrides};
use sunshine_recorder::Bridge;

#[derive(Parser)]
#[command(
    name = "sunshine-recorder",
    about = "Start and stop OBS recordings when Moonlight clients connect to Sunshine",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the Sunshine log and drive OBS recording.
    Run {
        /// Configuration file (TOML, or JSON by extension).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the Sunshine log path.
        #[arg(long)]
        log_path: Option<PathBuf>,
        /// Override the control channel port.
        #[arg(long)]
        control_port: Option<u16>,
        /// Do not read commands from stdin.
        #[arg(long)]
        no_console: bool,
    },
    /// Load and validate the configuration, then print it.
    Check {
        /// Configuration file (TOML, or JSON by extension).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Load the config file, apply overrides, then validate the result.
fn load_config(
    path: Option<PathBuf>,
    overrides: RunOverrides,
) -> Result<BridgeConfig, ConfigError> {
    let loader = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::ReadError {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            log_path,
            control_port,
            no_console,
        } => {
            let overrides = RunOverrides {
                log_path,
                control_port,
                no_console,
            };
            let config = match load_config(config, overrides) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load configuration");
                    return ExitCode::FAILURE;
                }
            };

            tracing::info!(
                obs = %format!("{}:{}", config.obs.host, config.obs.port),
                log_path = %config.sunshine.log_path.display(),
                control = %config.control.address(),
                "Starting Sunshine recorder"
            );

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown requested");
                signal_cancel.cancel();
            });

            match Bridge::new(config).run(cancel).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "Sunshine recorder stopped with an error");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Check { config } => match load_config(config, RunOverrides::default()) {
            Ok(mut config) => {
                if config.obs.password().is_some() {
                    config.obs.password = Some("********".to_string());
                }
                match toml::to_string_pretty(&config) {
                    Ok(text) => {
                        println!("{text}");
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to render configuration");
                        ExitCode::FAILURE
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Invalid configuration");
                ExitCode::FAILURE
            }
        },
    }
}
