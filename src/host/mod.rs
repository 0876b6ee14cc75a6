pub mod persistence;

use std::{collections::HashSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::ledger::{
    contract::Contract,
    error::{LedgerError, LedgerErrorKind, malformed_input},
    world_state::{MemoryWorldState, StagedWorldState},
};

pub use persistence::{LedgerPersistence, PersistedLedger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub msp_id: String,
    pub label: String,
}

impl fmt::Display for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.msp_id, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProposal {
    pub tx_id: String,
    pub channel: String,
    pub contract: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub creator: Creator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub seq_no: u64,
    pub tx_id: String,
    pub function: String,
    pub creator: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Default)]
struct HostState {
    world_state: MemoryWorldState,
    commits: Vec<CommittedTransaction>,
    tx_ids: HashSet<String>,
}

impl HostState {
    fn restore(persisted: PersistedLedger) -> Self {
        let tx_ids = persisted
            .commits
            .iter()
            .map(|commit| commit.tx_id.clone())
            .collect();
        Self {
            world_state: persisted.world_state(),
            commits: persisted.commits,
            tx_ids,
        }
    }
}

/// Single-node stand-in for the hosting platform: one contract on one channel, every
/// invocation serialized behind one lock and committed all-or-nothing.
pub struct LedgerHost {
    channel: String,
    contract: Arc<dyn Contract>,
    persistence: Option<LedgerPersistence>,
    state: Mutex<HostState>,
}

impl LedgerHost {
    pub fn new(channel: impl Into<String>, contract: Arc<dyn Contract>) -> Self {
        Self {
            channel: channel.into(),
            contract,
            persistence: None,
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn open(
        channel: impl Into<String>,
        contract: Arc<dyn Contract>,
        persistence: LedgerPersistence,
    ) -> Result<Self, LedgerError> {
        let state = match persistence.load()? {
            Some(persisted) => HostState::restore(persisted),
            None => HostState::default(),
        };
        tracing::info!(
            target: "host",
            path = %persistence.path().display(),
            keys = state.world_state.len(),
            height = state.commits.len(),
            "ledger_state_loaded"
        );

        Ok(Self {
            channel: channel.into(),
            contract,
            persistence: Some(persistence),
            state: Mutex::new(state),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn contract_name(&self) -> &str {
        self.contract.name()
    }

    pub async fn submit(&self, proposal: TransactionProposal) -> Result<Vec<u8>, LedgerError> {
        self.check_proposal(&proposal)?;
        let mut state = self.state.lock().await;

        if state.tx_ids.contains(&proposal.tx_id) {
            return Err(malformed_input(format!(
                "duplicate transaction id {}",
                proposal.tx_id
            )));
        }

        let (payload, write_set) = {
            let mut staged = StagedWorldState::new(&state.world_state);
            match self
                .contract
                .invoke(&mut staged, &proposal.function, &proposal.args)
            {
                Ok(payload) => (payload, staged.into_write_set()),
                Err(err) => {
                    tracing::warn!(
                        target: "host",
                        tx_id = %proposal.tx_id,
                        function = %proposal.function,
                        kind = ?err.kind,
                        error = %err,
                        "transaction_rejected"
                    );
                    return Err(err);
                }
            }
        };

        let commit = CommittedTransaction {
            seq_no: state.commits.len() as u64 + 1,
            tx_id: proposal.tx_id,
            function: proposal.function,
            creator: proposal.creator.to_string(),
            keys: write_set.keys(),
        };

        // Nothing live changes until the snapshot holding this commit is durable.
        if let Some(persistence) = &self.persistence {
            let snapshot = PersistedLedger::capture(
                &state.world_state,
                &write_set,
                state.commits.iter().chain([&commit]),
            )?;
            persistence.save(&snapshot)?;
        }

        tracing::info!(
            target: "host",
            seq_no = commit.seq_no,
            tx_id = %commit.tx_id,
            function = %commit.function,
            keys = ?commit.keys,
            "transaction_committed"
        );
        state.world_state.apply(write_set);
        state.tx_ids.insert(commit.tx_id.clone());
        state.commits.push(commit);

        Ok(payload)
    }

    pub async fn evaluate(&self, proposal: TransactionProposal) -> Result<Vec<u8>, LedgerError> {
        self.check_proposal(&proposal)?;
        let state = self.state.lock().await;
        let mut staged = StagedWorldState::new(&state.world_state);
        let result = self
            .contract
            .invoke(&mut staged, &proposal.function, &proposal.args);
        if let Err(err) = &result {
            tracing::debug!(
                target: "host",
                tx_id = %proposal.tx_id,
                function = %proposal.function,
                kind = ?err.kind,
                "evaluation_failed"
            );
        }
        result
    }

    pub async fn height(&self) -> u64 {
        self.state.lock().await.commits.len() as u64
    }

    pub async fn commit_log(&self) -> Vec<CommittedTransaction> {
        self.state.lock().await.commits.clone()
    }

    pub async fn snapshot_state(&self) -> MemoryWorldState {
        self.state.lock().await.world_state.clone()
    }

    fn check_proposal(&self, proposal: &TransactionProposal) -> Result<(), LedgerError> {
        if proposal.creator.msp_id.trim().is_empty() || proposal.creator.label.trim().is_empty() {
            return Err(LedgerError::new(
                LedgerErrorKind::Unauthorized,
                "an identity is required to invoke the ledger",
            ));
        }
        if proposal.channel != self.channel {
            return Err(LedgerError::new(
                LedgerErrorKind::UnknownChannel,
                format!("channel {} is not hosted here", proposal.channel),
            ));
        }
        if proposal.contract != self.contract.name() {
            return Err(LedgerError::new(
                LedgerErrorKind::UnknownContract,
                format!(
                    "contract {} is not deployed on channel {}",
                    proposal.contract, self.channel
                ),
            ));
        }
        if proposal.tx_id.is_empty() {
            return Err(malformed_input("transaction id cannot be empty"));
        }
        Ok(())
    }
}

pub fn transaction_id(nonce: &[u8], creator: &Creator) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator.msp_id.as_bytes());
    hasher.update(creator.label.as_bytes());
    format!("{:x}", hasher.finalize())
}
