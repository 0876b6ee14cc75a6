use serde::{Deserialize, Serialize};

use crate::ledger::{
    clock::parse_timestamp,
    error::{LedgerError, internal_error, malformed_input, malformed_record},
};

/// The one persisted entity: the latest rainfall measurement for a district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RainfallRecord {
    pub district: String,
    /// Millimeters.
    pub rainfall: u32,
    pub timestamp: String,
    pub recorded_by: String,
}

impl RainfallRecord {
    pub fn decode(bytes: &[u8]) -> Result<Self, LedgerError> {
        let record: RainfallRecord = serde_json::from_slice(bytes)
            .map_err(|err| malformed_record(format!("invalid rainfall record: {err}")))?;

        if record.district.is_empty() {
            return Err(malformed_record("rainfall record has an empty district"));
        }
        if record.recorded_by.is_empty() {
            return Err(malformed_record(format!(
                "rainfall record for {} has an empty recordedBy",
                record.district
            )));
        }
        parse_timestamp(&record.timestamp)?;

        Ok(record)
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        serde_json::to_vec(self).map_err(|err| {
            internal_error(format!(
                "failed to encode rainfall record for {}: {err}",
                self.district
            ))
        })
    }
}

pub fn parse_rainfall(text: &str) -> Result<u32, LedgerError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(malformed_input(format!(
            "rainfall must be a non-negative integer in millimeters, got '{text}'"
        )));
    }

    trimmed
        .parse::<u32>()
        .map_err(|err| malformed_input(format!("rainfall '{text}' is out of range: {err}")))
}
