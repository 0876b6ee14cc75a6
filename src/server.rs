use std::{
    fs,
    io::ErrorKind,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
};
use tokio_util::sync::CancellationToken;

use crate::{
    host::LedgerHost,
    ledger::error::LedgerErrorKind,
    wire::{ClientMessage, HostResponse, ResponseOutcome, encode_line, parse_client_message},
};

/// Serves one [`LedgerHost`] over a unix socket, one NDJSON request per line.
pub struct LedgerServer {
    socket_path: PathBuf,
    host: Arc<LedgerHost>,
}

impl LedgerServer {
    pub fn new(socket_path: PathBuf, host: Arc<LedgerHost>) -> Self {
        Self { socket_path, host }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        prepare_socket_path(&self.socket_path)?;
        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("unable to bind socket {}", self.socket_path.display()))?;

        tracing::info!(
            target: "server",
            socket = %self.socket_path.display(),
            channel = %self.host.channel(),
            contract = %self.host.contract_name(),
            "ledger_listening"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let host = Arc::clone(&self.host);
                            tokio::spawn(async move {
                                if let Err(err) = handle_client(stream, host).await {
                                    tracing::warn!(target: "server", error = %format!("{err:#}"), "client_handling_failed");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::warn!(target: "server", error = %err, "accept_failed");
                        }
                    }
                }
            }
        }

        cleanup_socket_path(&self.socket_path)?;
        tracing::info!(target: "server", socket = %self.socket_path.display(), "ledger_stopped");
        Ok(())
    }
}

async fn handle_client(stream: UnixStream, host: Arc<LedgerHost>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, close) = match parse_client_message(line) {
            Ok(ClientMessage::Submit {
                request_id,
                proposal,
            }) => (
                HostResponse::from_result(request_id, host.submit(proposal).await),
                false,
            ),
            Ok(ClientMessage::Evaluate {
                request_id,
                proposal,
            }) => (
                HostResponse::from_result(request_id, host.evaluate(proposal).await),
                false,
            ),
            Ok(ClientMessage::Close { request_id }) => (
                HostResponse::from_result(request_id, Ok(Vec::new())),
                true,
            ),
            Err(err) => {
                tracing::warn!(target: "server", error = %err, "ignoring_invalid_protocol_message");
                (
                    HostResponse {
                        request_id: String::new(),
                        outcome: ResponseOutcome::Error {
                            kind: LedgerErrorKind::Internal,
                            message: err.to_string(),
                        },
                    },
                    false,
                )
            }
        };

        let encoded = encode_line(&response)?;
        write_half.write_all(encoded.as_bytes()).await?;
        write_half.flush().await?;

        if close {
            break;
        }
    }

    Ok(())
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}
