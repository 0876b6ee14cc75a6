use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    host::Creator,
    oracle::error::{ClientError, identity_missing},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub label: String,
    pub msp_id: String,
    pub certificate: String,
}

impl Identity {
    pub fn creator(&self) -> Creator {
        Creator {
            msp_id: self.msp_id.clone(),
            label: self.label.clone(),
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when no identity is stored under `label`.
    fn get(&self, label: &str) -> Result<Option<Identity>, ClientError>;
}

pub fn require_identity(
    provider: &dyn IdentityProvider,
    label: &str,
) -> Result<Identity, ClientError> {
    provider.get(label)?.ok_or_else(|| {
        identity_missing(format!(
            "an identity for the user \"{label}\" does not exist in the wallet"
        ))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletEntry {
    #[serde(rename = "type")]
    kind: String,
    msp_id: String,
    credentials: WalletCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletCredentials {
    certificate: String,
}

/// Directory of `<label>.id` JSON files.
#[derive(Debug, Clone)]
pub struct FileSystemWallet {
    dir: PathBuf,
}

impl FileSystemWallet {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn put(&self, identity: &Identity) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create wallet directory {}", self.dir.display()))?;

        let entry = WalletEntry {
            kind: "X.509".to_string(),
            msp_id: identity.msp_id.clone(),
            credentials: WalletCredentials {
                certificate: identity.certificate.clone(),
            },
        };
        let path = self.entry_path(&identity.label);
        let content =
            serde_json::to_string_pretty(&entry).context("failed to encode wallet entry")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write wallet entry {}", path.display()))
    }

    fn entry_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.id"))
    }
}

impl IdentityProvider for FileSystemWallet {
    fn get(&self, label: &str) -> Result<Option<Identity>, ClientError> {
        if label.is_empty() || label.contains(['/', '\\']) {
            return Ok(None);
        }

        let path = self.entry_path(label);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(identity_missing(format!(
                    "failed to read wallet entry {}: {err}",
                    path.display()
                )));
            }
        };

        let entry: WalletEntry = serde_json::from_str(&content).map_err(|err| {
            identity_missing(format!(
                "wallet entry {} is malformed: {err}",
                path.display()
            ))
        })?;

        Ok(Some(Identity {
            label: label.to_string(),
            msp_id: entry.msp_id,
            certificate: entry.credentials.certificate,
        }))
    }
}
