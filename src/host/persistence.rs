use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    host::CommittedTransaction,
    ledger::{
        error::{LedgerError, storage_error},
        world_state::{MemoryWorldState, WriteSet},
    },
};

const PERSISTENCE_VERSION: u64 = 1;

#[derive(Debug, Clone)]
pub struct LedgerPersistence {
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLedger {
    pub version: u64,
    pub state: BTreeMap<String, String>,
    pub commits: Vec<CommittedTransaction>,
}

impl PersistedLedger {
    /// Snapshot of `state` with `pending` writes laid over it, as it will look once
    /// the commit that produced them is applied.
    pub fn capture<'a>(
        state: &MemoryWorldState,
        pending: &WriteSet,
        commits: impl IntoIterator<Item = &'a CommittedTransaction>,
    ) -> Result<Self, LedgerError> {
        let mut entries = BTreeMap::new();
        for (key, value) in state.entries().iter().chain(pending.iter()) {
            let text = std::str::from_utf8(value).map_err(|err| {
                storage_error(format!("value for key '{key}' is not valid utf-8: {err}"))
            })?;
            entries.insert(key.clone(), text.to_string());
        }

        Ok(Self {
            version: PERSISTENCE_VERSION,
            state: entries,
            commits: commits.into_iter().cloned().collect(),
        })
    }

    pub fn world_state(&self) -> MemoryWorldState {
        MemoryWorldState::from_entries(
            self.state
                .iter()
                .map(|(key, value)| (key.clone(), value.clone().into_bytes()))
                .collect(),
        )
    }
}

impl LedgerPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<PersistedLedger>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(storage_error(format!(
                    "failed to read ledger state '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedLedger = serde_json::from_str(&content).map_err(|err| {
            storage_error(format!(
                "failed to parse ledger state '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != PERSISTENCE_VERSION {
            return Err(storage_error(format!(
                "unsupported ledger state version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed))
    }

    pub fn save(&self, ledger: &PersistedLedger) -> Result<(), LedgerError> {
        let parent = self.path.parent().ok_or_else(|| {
            storage_error(format!(
                "ledger state path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            storage_error(format!(
                "failed to create ledger state directory '{}': {err}",
                parent.display()
            ))
        })?;

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            storage_error(format!(
                "failed to create ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, ledger).map_err(|err| {
                storage_error(format!(
                    "failed to serialize ledger state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").map_err(|err| {
                storage_error(format!(
                    "failed to finalize ledger state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                storage_error(format!(
                    "failed to flush ledger state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }
        file.sync_all().map_err(|err| {
            storage_error(format!(
                "failed to sync ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            storage_error(format!(
                "failed to replace ledger state '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        Ok(())
    }
}
