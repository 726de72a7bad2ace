//! Config Browser - browse a configuration folder and refresh it from S3
//!
//! Runs an IPC server for the administrative UI, or one-shot CLI commands.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config_browser::browser::ConfigBrowser;
use config_browser::config::BrowserConfig;
use config_browser::ipc::IpcServer;
use config_browser::remote::S3Store;
use config_browser::sync::SyncError;

/// CLI command
#[derive(Debug)]
enum Command {
    /// Run IPC server mode (default)
    Server,
    /// List config files
    List,
    /// Print one config file
    Show { name: String },
    /// Refresh the config folder from the bucket
    Sync,
    /// Show help
    Help,
}

/// Parsed command line
#[derive(Debug)]
struct Args {
    command: Command,
    config_path: Option<PathBuf>,
}

fn print_help() {
    eprintln!(
        r#"Config Browser - browse configuration files and refresh them from S3

USAGE:
    config-browser [--config <path>]                 # Run IPC server (default)
    config-browser [--config <path>] list
    config-browser [--config <path>] show <file>
    config-browser [--config <path>] sync
    config-browser help

COMMANDS:
    (none)  Run IPC server mode (waits for commands from the admin UI)
    list    List files in the config folder
    show    Print the content of one config file
    sync    Download the configured bucket prefix into the config folder
    help    Show this help message

ENVIRONMENT:
    CONFIG_BROWSER_CONFIG   Config file path (default: <config dir>/config-browser/config.toml)
    CONFIG_FOLDER           Override config_folder
    SYNC_ENABLED            Override sync.enabled (true/false)
    SYNC_BUCKET             Override sync.bucket
    SYNC_PREFIX             Override sync.prefix
    RUST_LOG                Log filter (trace, debug, info, warn, error)

S3 credentials are taken from the standard AWS environment and profile files.
"#
    );
}

fn parse_args() -> Result<Args> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            _ => positional.push(arg),
        }
    }

    let command = match positional.first().map(String::as_str) {
        None => Command::Server,
        Some("list") => Command::List,
        Some("show") => {
            let name = positional
                .get(1)
                .ok_or_else(|| anyhow!("Usage: config-browser show <file>"))?;
            Command::Show { name: name.clone() }
        }
        Some("sync") => Command::Sync,
        Some("help" | "--help" | "-h") => Command::Help,
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            Command::Help
        }
    };

    Ok(Args {
        command,
        config_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if let Command::Help = args.command {
        print_help();
        return Ok(());
    }

    let config_path = args.config_path.unwrap_or_else(BrowserConfig::default_path);
    let config = BrowserConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    info!(
        config_folder = %config.config_folder.display(),
        sync_enabled = config.sync.enabled,
        "Configuration loaded"
    );

    let remote = Arc::new(S3Store::new(&config.sync));
    let browser = Arc::new(ConfigBrowser::from_config(&config, remote));

    match args.command {
        Command::Server => {
            info!("Starting config browser in IPC server mode");

            let mut ipc_server = IpcServer::new(Arc::clone(&browser), config.socket_path.clone());
            if let Err(e) = ipc_server.start().await {
                error!(error = %e, "Failed to start IPC server");
                return Err(e);
            }
            let ipc_server = Arc::new(ipc_server);

            info!("Ready. Waiting for commands from the admin UI...");

            let server = Arc::clone(&ipc_server);
            let ipc_handle = tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!(error = %e, "IPC server error");
                }
            });

            tokio::signal::ctrl_c().await?;

            info!(
                connections = ipc_server.connection_count().await,
                "Received shutdown signal"
            );
            ipc_handle.abort();
            if let Err(e) = ipc_server.stop() {
                warn!(error = %e, "Failed to clean up socket");
            }

            info!("Shutdown complete.");
        }
        Command::List => {
            let files = browser.list_files()?;
            if files.is_empty() {
                println!("No config files in {}", config.config_folder.display());
            }
            for name in files.iter() {
                println!("{}", name);
            }
        }
        Command::Show { name } => {
            let selection = browser.select(&name);
            if !selection.is_available() {
                warn!(name = %name, "Config file could not be read");
            }
            print!("{}", selection.text());
        }
        Command::Sync => match browser.run_sync().await {
            Ok(outcome) => {
                let report = outcome.report;
                println!(
                    "Synced {} file(s) from {} page(s), {} failed",
                    report.downloaded.len(),
                    report.pages,
                    report.failures.len()
                );
                for failure in &report.failures {
                    println!("  failed: {} ({})", failure.key, failure.error);
                }
            }
            Err(SyncError::Disabled) => {
                println!("Sync is disabled in the configuration.");
            }
            Err(e) => {
                error!(error = %e, "Sync failed");
                return Err(e.into());
            }
        },
        Command::Help => print_help(),
    }

    Ok(())
}
