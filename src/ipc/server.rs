//! IPC Server - Unix socket server for front end communication
//!
//! Handles incoming connections from the administrative UI and dispatches
//! commands to the ConfigBrowser.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::browser::{ConfigBrowser, PLACEHOLDER};
use crate::ipc::protocol::{
    parse_command, serialize_response, CacheInfo, Command, Response, SelectionInfo,
    PROTOCOL_VERSION,
};
use crate::remote::{RemoteDownloader, RemoteLister};
use crate::sync::SyncError;

/// IPC Server that listens for commands from the front end
pub struct IpcServer<R> {
    /// Browser session shared by all connections
    browser: Arc<ConfigBrowser<R>>,
    /// Socket path to bind
    socket_path: PathBuf,
    /// Socket listener
    listener: Option<UnixListener>,
    /// Active connections counter
    connection_count: Arc<RwLock<u32>>,
}

impl<R> IpcServer<R>
where
    R: RemoteLister + RemoteDownloader + 'static,
{
    /// Create a new IPC server
    pub fn new(browser: Arc<ConfigBrowser<R>>, socket_path: PathBuf) -> Self {
        Self {
            browser,
            socket_path,
            listener: None,
            connection_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Bind the socket, replacing a stale socket file
    pub async fn start(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("Failed to remove existing socket file")?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind Unix socket {}", self.socket_path.display()))?;

        info!(socket_path = %self.socket_path.display(), "IPC server started");

        self.listener = Some(listener);
        Ok(())
    }

    /// Run the server loop, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("Server not started")?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let browser = Arc::clone(&self.browser);
                    let connection_count = Arc::clone(&self.connection_count);

                    // Spawn a new task to handle this connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, browser, connection_count).await {
                            error!(error = %e, "Connection handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Remove the socket file
    pub fn stop(&self) -> Result<()> {
        remove_socket(&self.socket_path)?;
        info!("IPC server stopped");
        Ok(())
    }

    /// Get the number of active connections
    pub async fn connection_count(&self) -> u32 {
        *self.connection_count.read().await
    }
}

fn remove_socket(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).context("Failed to remove socket file")?;
    }
    Ok(())
}

/// Handle a single client connection
async fn handle_connection<R>(
    stream: UnixStream,
    browser: Arc<ConfigBrowser<R>>,
    connection_count: Arc<RwLock<u32>>,
) -> Result<()>
where
    R: RemoteLister + RemoteDownloader,
{
    {
        let mut count = connection_count.write().await;
        *count += 1;
        debug!(count = *count, "New connection");
    }

    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    // Read commands line by line (newline-delimited JSON)
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Connection closed by client");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                debug!(command = %trimmed, "Received command");

                let response = match parse_command(trimmed.as_bytes()) {
                    Ok(command) => process_command(command, browser.as_ref()).await,
                    Err(e) => {
                        warn!(error = %e, command = %trimmed, "Failed to parse command");
                        Response::Error {
                            error: format!("Invalid command: {}", e),
                        }
                    }
                };

                match serialize_response(&response) {
                    Ok(json) => {
                        if let Err(e) = writer.write_all(&json).await {
                            error!(error = %e, "Failed to write response");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to serialize response");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to read from socket");
                break;
            }
        }
    }

    {
        let mut count = connection_count.write().await;
        *count = count.saturating_sub(1);
        debug!(count = *count, "Connection ended");
    }

    Ok(())
}

/// Process a command and return a response
pub async fn process_command<R>(command: Command, browser: &ConfigBrowser<R>) -> Response
where
    R: RemoteLister + RemoteDownloader,
{
    match command {
        Command::ListFiles => match browser.list_files() {
            Ok(files) => Response::Files {
                files: files.to_vec(),
            },
            Err(e) => Response::Error {
                error: e.to_string(),
            },
        },

        Command::Rescan => match browser.rescan() {
            Ok(files) => Response::Files {
                files: files.to_vec(),
            },
            Err(e) => Response::Error {
                error: e.to_string(),
            },
        },

        Command::Select { name } => {
            let selection = browser.select(&name);
            Response::Selection(SelectionInfo::from(&selection))
        }

        Command::GetStatus => Response::Status {
            version: PROTOCOL_VERSION,
            sync_enabled: browser.sync_enabled(),
            selection: browser.current_name(),
            placeholder: PLACEHOLDER.to_string(),
            cache: CacheInfo::from(browser.cache_stats()),
        },

        Command::RunSync => {
            info!("Processing runSync command");

            match browser.run_sync().await {
                Ok(outcome) => Response::sync_complete(&outcome.report, outcome.selection.as_ref()),
                Err(SyncError::Interrupted { report, source }) => Response::Error {
                    error: format!(
                        "Sync interrupted after {} file(s): {}",
                        report.downloaded.len(),
                        source
                    ),
                },
                Err(e) => Response::Error {
                    error: format!("Sync failed: {}", e),
                },
            }
        }
    }
}
