use std::sync::Mutex;

use time::{
    Duration, OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::ledger::error::{LedgerError, internal_error, malformed_record};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Test clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().expect("lock poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("lock poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("lock poisoned")
    }
}

pub fn format_timestamp(at: OffsetDateTime) -> Result<String, LedgerError> {
    at.to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .map_err(|err| internal_error(format!("failed to format timestamp: {err}")))
}

pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime, LedgerError> {
    PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|err| malformed_record(format!("invalid timestamp '{text}': {err}")))
}

/// Stamps the current time, bumped past `previous` so stamps for a key only ever move forward.
pub fn stamp_after(clock: &dyn Clock, previous: Option<&str>) -> Result<String, LedgerError> {
    let mut at = clock.now().to_offset(time::UtcOffset::UTC);
    // Stamps carry millisecond precision; compare at that resolution.
    at = at
        .replace_nanosecond(at.millisecond() as u32 * 1_000_000)
        .map_err(|err| internal_error(format!("failed to truncate timestamp: {err}")))?;

    if let Some(previous) = previous {
        let previous_at = parse_timestamp(previous)?;
        if at <= previous_at {
            at = previous_at
                .checked_add(Duration::milliseconds(1))
                .ok_or_else(|| {
                    malformed_record(format!(
                        "timestamp {previous} leaves no room for a later stamp"
                    ))
                })?;
        }
    }

    format_timestamp(at)
}
