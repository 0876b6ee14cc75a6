use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        UnixStream,
        unix::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

use crate::{
    host::{LedgerHost, TransactionProposal},
    ledger::error::LedgerError,
    oracle::error::{ClientError, malformed_response, transport_failure},
    wire::{ClientMessage, encode_line, parse_host_response},
};

/// Outer `Err` is a transport problem; the inner result is the ledger's verdict.
pub type TransactionResult = Result<Result<Vec<u8>, LedgerError>, ClientError>;

#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn submit(&self, proposal: TransactionProposal) -> TransactionResult;

    async fn evaluate(&self, proposal: TransactionProposal) -> TransactionResult;

    async fn close(&self) -> Result<(), ClientError>;
}

/// Calls a [`LedgerHost`] living in the same process.
pub struct InProcessTransport {
    host: Arc<LedgerHost>,
}

impl InProcessTransport {
    pub fn new(host: Arc<LedgerHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl LedgerTransport for InProcessTransport {
    async fn submit(&self, proposal: TransactionProposal) -> TransactionResult {
        Ok(self.host.submit(proposal).await)
    }

    async fn evaluate(&self, proposal: TransactionProposal) -> TransactionResult {
        Ok(self.host.evaluate(proposal).await)
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

struct SocketConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

pub struct UnixSocketTransport {
    socket_path: PathBuf,
    connection: Mutex<Option<SocketConnection>>,
    next_request_id: AtomicU64,
}

impl UnixSocketTransport {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|err| {
            transport_failure(format!(
                "unable to connect to ledger socket {}: {err}",
                socket_path.display()
            ))
        })?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            connection: Mutex::new(Some(SocketConnection {
                lines: BufReader::new(read_half).lines(),
                writer,
            })),
            next_request_id: AtomicU64::new(1),
        })
    }

    fn allocate_request_id(&self) -> String {
        format!(
            "req:{}",
            self.next_request_id.fetch_add(1, Ordering::Relaxed)
        )
    }

    async fn round_trip(&self, message: ClientMessage) -> TransactionResult {
        let mut connection = self.connection.lock().await;
        let Some(connection) = connection.as_mut() else {
            return Err(transport_failure(format!(
                "connection to {} is already closed",
                self.socket_path.display()
            )));
        };

        let encoded = encode_line(&message)
            .map_err(|err| transport_failure(format!("failed to encode request: {err}")))?;
        connection
            .writer
            .write_all(encoded.as_bytes())
            .await
            .map_err(|err| transport_failure(format!("failed to send request: {err}")))?;
        connection
            .writer
            .flush()
            .await
            .map_err(|err| transport_failure(format!("failed to flush request: {err}")))?;

        let line = connection
            .lines
            .next_line()
            .await
            .map_err(|err| transport_failure(format!("failed to read response: {err}")))?
            .ok_or_else(|| transport_failure("ledger closed the connection before responding"))?;

        let response = parse_host_response(line.trim())
            .map_err(|err| malformed_response(err.to_string()))?;
        if response.request_id != message.request_id() {
            return Err(transport_failure(format!(
                "response id mismatch: expected={}, got={}",
                message.request_id(),
                response.request_id
            )));
        }

        Ok(response.into_result())
    }
}

#[async_trait]
impl LedgerTransport for UnixSocketTransport {
    async fn submit(&self, proposal: TransactionProposal) -> TransactionResult {
        self.round_trip(ClientMessage::Submit {
            request_id: self.allocate_request_id(),
            proposal,
        })
        .await
    }

    async fn evaluate(&self, proposal: TransactionProposal) -> TransactionResult {
        self.round_trip(ClientMessage::Evaluate {
            request_id: self.allocate_request_id(),
            proposal,
        })
        .await
    }

    async fn close(&self) -> Result<(), ClientError> {
        let acknowledged = self
            .round_trip(ClientMessage::Close {
                request_id: self.allocate_request_id(),
            })
            .await;

        let mut connection = self.connection.lock().await;
        if let Some(mut connection) = connection.take() {
            let _ = connection.writer.shutdown().await;
        }

        match acknowledged {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(transport_failure(format!(
                "ledger refused to close the session: {err}"
            ))),
            Err(err) => Err(err),
        }
    }
}

/// Opens a fresh transport per protocol run.
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn LedgerTransport>, ClientError>;
}

pub struct UnixSocketConnector {
    socket_path: PathBuf,
}

impl UnixSocketConnector {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }
}

#[async_trait]
impl LedgerConnector for UnixSocketConnector {
    async fn connect(&self) -> Result<Arc<dyn LedgerTransport>, ClientError> {
        let transport = UnixSocketTransport::connect(&self.socket_path).await?;
        Ok(Arc::new(transport))
    }
}

pub struct InProcessConnector {
    host: Arc<LedgerHost>,
}

impl InProcessConnector {
    pub fn new(host: Arc<LedgerHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl LedgerConnector for InProcessConnector {
    async fn connect(&self) -> Result<Arc<dyn LedgerTransport>, ClientError> {
        Ok(Arc::new(InProcessTransport::new(Arc::clone(&self.host))))
    }
}
