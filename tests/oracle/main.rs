mod client;

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use rainledger::{
    host::{LedgerHost, TransactionProposal},
    ledger::{ManualClock, RainfallContract},
    oracle::{
        ClientError, Identity, IdentityProvider, InProcessTransport, LedgerConnector,
        LedgerTransport, OracleSettings, transport::TransactionResult,
    },
};
use time::macros::datetime;

pub fn welfare_host() -> Arc<LedgerHost> {
    let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 06:00:00 UTC)));
    Arc::new(LedgerHost::new(
        "mychannel",
        Arc::new(RainfallContract::new("welfare", clock)),
    ))
}

pub fn settings() -> OracleSettings {
    OracleSettings {
        identity: "admin".to_string(),
        channel: "mychannel".to_string(),
        contract: "welfare".to_string(),
    }
}

pub fn admin_identity() -> Identity {
    Identity {
        label: "admin".to_string(),
        msp_id: "Org1MSP".to_string(),
        certificate: "-----BEGIN CERTIFICATE-----".to_string(),
    }
}

#[derive(Default)]
pub struct MemoryWallet {
    identities: BTreeMap<String, Identity>,
}

impl MemoryWallet {
    pub fn with(identity: Identity) -> Self {
        let mut identities = BTreeMap::new();
        identities.insert(identity.label.clone(), identity);
        Self { identities }
    }
}

impl IdentityProvider for MemoryWallet {
    fn get(&self, label: &str) -> Result<Option<Identity>, ClientError> {
        Ok(self.identities.get(label).cloned())
    }
}

/// Counts connects and closes around an in-process host.
pub struct RecordingConnector {
    host: Arc<LedgerHost>,
    pub connects: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub submits: Arc<AtomicUsize>,
}

impl RecordingConnector {
    pub fn new(host: Arc<LedgerHost>) -> Self {
        Self {
            host,
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            submits: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct RecordingTransport {
    inner: InProcessTransport,
    closes: Arc<AtomicUsize>,
    submits: Arc<AtomicUsize>,
}

#[async_trait]
impl LedgerTransport for RecordingTransport {
    async fn submit(&self, proposal: TransactionProposal) -> TransactionResult {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.inner.submit(proposal).await
    }

    async fn evaluate(&self, proposal: TransactionProposal) -> TransactionResult {
        self.inner.evaluate(proposal).await
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[async_trait]
impl LedgerConnector for RecordingConnector {
    async fn connect(&self) -> Result<Arc<dyn LedgerTransport>, ClientError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingTransport {
            inner: InProcessTransport::new(Arc::clone(&self.host)),
            closes: Arc::clone(&self.closes),
            submits: Arc::clone(&self.submits),
        }))
    }
}
