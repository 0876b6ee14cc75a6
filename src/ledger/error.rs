use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerErrorKind {
    NotFound,
    MalformedInput,
    MalformedRecord,
    UnknownFunction,
    UnknownChannel,
    UnknownContract,
    Unauthorized,
    Storage,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LedgerError {}

pub fn not_found(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::NotFound, message)
}

pub fn malformed_input(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::MalformedInput, message)
}

pub fn malformed_record(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::MalformedRecord, message)
}

pub fn unknown_function(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::UnknownFunction, message)
}

pub fn storage_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Storage, message)
}

pub fn internal_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Internal, message)
}
