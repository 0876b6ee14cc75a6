use std::fmt;

use crate::ledger::error::{LedgerError, LedgerErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    IdentityMissing,
    TransportFailure,
    TransactionRejected,
    MalformedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
    pub ledger_kind: Option<LedgerErrorKind>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ledger_kind: None,
        }
    }

    pub fn rejected(function: &str, err: LedgerError) -> Self {
        Self {
            kind: ClientErrorKind::TransactionRejected,
            message: format!("{function} was rejected: {}", err.message),
            ledger_kind: Some(err.kind),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ledger_kind {
            Some(kind) => write!(f, "{} (ledger={:?})", self.message, kind),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ClientError {}

pub fn identity_missing(message: impl Into<String>) -> ClientError {
    ClientError::new(ClientErrorKind::IdentityMissing, message)
}

pub fn transport_failure(message: impl Into<String>) -> ClientError {
    ClientError::new(ClientErrorKind::TransportFailure, message)
}

pub fn malformed_response(message: impl Into<String>) -> ClientError {
    ClientError::new(ClientErrorKind::MalformedResponse, message)
}
