use std::sync::Arc;

use crate::ledger::{
    clock::{Clock, stamp_after},
    error::{LedgerError, malformed_input, not_found, unknown_function},
    record::{RainfallRecord, parse_rainfall},
    world_state::WorldState,
};

pub const INIT_LEDGER: &str = "InitLedger";
pub const READ_RAINFALL: &str = "ReadRainfall";
pub const UPDATE_RAINFALL: &str = "UpdateRainfall";

/// State-transition logic hosted by the ledger. Implementations hold no per-call state;
/// the host supplies the store handle and runs each invocation atomically.
pub trait Contract: Send + Sync {
    fn name(&self) -> &str;

    fn init_ledger(&self, store: &mut dyn WorldState) -> Result<(), LedgerError>;

    fn read_rainfall(
        &self,
        store: &dyn WorldState,
        district: &str,
    ) -> Result<RainfallRecord, LedgerError>;

    fn update_rainfall(
        &self,
        store: &mut dyn WorldState,
        district: &str,
        new_rainfall: &str,
        recorded_by: &str,
    ) -> Result<RainfallRecord, LedgerError>;

    fn invoke(
        &self,
        store: &mut dyn WorldState,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        match (function, args) {
            (INIT_LEDGER, []) => {
                self.init_ledger(store)?;
                Ok(Vec::new())
            }
            (READ_RAINFALL, [district]) => self.read_rainfall(store, district)?.encode(),
            (UPDATE_RAINFALL, [district, new_rainfall, recorded_by]) => self
                .update_rainfall(store, district, new_rainfall, recorded_by)?
                .encode(),
            (INIT_LEDGER | READ_RAINFALL | UPDATE_RAINFALL, _) => Err(malformed_input(format!(
                "{function} called with {} argument(s)",
                args.len()
            ))),
            _ => Err(unknown_function(format!(
                "contract {} has no function named {function}",
                self.name()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRow {
    pub district: &'static str,
    pub rainfall: u32,
    pub recorded_by: &'static str,
}

pub const SEED_ROWS: &[SeedRow] = &[
    SeedRow {
        district: "pune",
        rainfall: 78,
        recorded_by: "IMD",
    },
    SeedRow {
        district: "mumbai",
        rainfall: 102,
        recorded_by: "IMD",
    },
];

pub struct RainfallContract {
    name: String,
    clock: Arc<dyn Clock>,
}

impl RainfallContract {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            clock,
        }
    }
}

impl Contract for RainfallContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_ledger(&self, store: &mut dyn WorldState) -> Result<(), LedgerError> {
        tracing::info!(target: "contract", contract = %self.name, "init_ledger_start");
        for row in SEED_ROWS {
            let previous = match store.get_state(row.district)? {
                Some(bytes) if !bytes.is_empty() => RainfallRecord::decode(&bytes).ok(),
                _ => None,
            };
            let record = RainfallRecord {
                district: row.district.to_string(),
                rainfall: row.rainfall,
                timestamp: stamp_after(
                    self.clock.as_ref(),
                    previous.as_ref().map(|record| record.timestamp.as_str()),
                )?,
                recorded_by: row.recorded_by.to_string(),
            };
            store.put_state(row.district, record.encode()?)?;
            tracing::info!(
                target: "contract",
                district = %row.district,
                rainfall = row.rainfall,
                "rainfall_record_initialized"
            );
        }
        tracing::info!(target: "contract", contract = %self.name, "init_ledger_end");
        Ok(())
    }

    fn read_rainfall(
        &self,
        store: &dyn WorldState,
        district: &str,
    ) -> Result<RainfallRecord, LedgerError> {
        let bytes = match store.get_state(district)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Err(not_found(format!(
                    "the rainfall record for {district} does not exist"
                )));
            }
        };
        RainfallRecord::decode(&bytes)
    }

    fn update_rainfall(
        &self,
        store: &mut dyn WorldState,
        district: &str,
        new_rainfall: &str,
        recorded_by: &str,
    ) -> Result<RainfallRecord, LedgerError> {
        tracing::info!(target: "contract", district = %district, "update_rainfall_start");

        let mut record = self.read_rainfall(store, district)?;
        let rainfall = parse_rainfall(new_rainfall)?;
        if recorded_by.trim().is_empty() {
            return Err(malformed_input("recordedBy cannot be empty"));
        }

        record.rainfall = rainfall;
        record.timestamp = stamp_after(self.clock.as_ref(), Some(&record.timestamp))?;
        record.recorded_by = recorded_by.to_string();
        store.put_state(district, record.encode()?)?;

        tracing::info!(
            target: "contract",
            district = %district,
            rainfall = record.rainfall,
            recorded_by = %record.recorded_by,
            "update_rainfall_end"
        );
        Ok(record)
    }
}
