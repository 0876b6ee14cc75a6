use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    host::TransactionProposal,
    ledger::error::{LedgerError, LedgerErrorKind},
};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid protocol message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode protocol message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("ledger payload is not valid utf-8")]
    NonUtf8Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Submit {
        request_id: String,
        proposal: TransactionProposal,
    },
    Evaluate {
        request_id: String,
        proposal: TransactionProposal,
    },
    Close {
        request_id: String,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> &str {
        match self {
            ClientMessage::Submit { request_id, .. }
            | ClientMessage::Evaluate { request_id, .. }
            | ClientMessage::Close { request_id } => request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Ok {
        payload: String,
    },
    Error {
        kind: LedgerErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResponse {
    pub request_id: String,
    pub outcome: ResponseOutcome,
}

impl HostResponse {
    pub fn from_result(
        request_id: impl Into<String>,
        result: Result<Vec<u8>, LedgerError>,
    ) -> Self {
        let outcome = match result {
            Ok(payload) => match String::from_utf8(payload) {
                Ok(payload) => ResponseOutcome::Ok { payload },
                Err(_) => ResponseOutcome::Error {
                    kind: LedgerErrorKind::Internal,
                    message: WireError::NonUtf8Payload.to_string(),
                },
            },
            Err(err) => ResponseOutcome::Error {
                kind: err.kind,
                message: err.message,
            },
        };

        Self {
            request_id: request_id.into(),
            outcome,
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>, LedgerError> {
        match self.outcome {
            ResponseOutcome::Ok { payload } => Ok(payload.into_bytes()),
            ResponseOutcome::Error { kind, message } => Err(LedgerError::new(kind, message)),
        }
    }
}

pub fn parse_client_message(line: &str) -> Result<ClientMessage, WireError> {
    serde_json::from_str(line).map_err(WireError::Decode)
}

pub fn parse_host_response(line: &str) -> Result<HostResponse, WireError> {
    serde_json::from_str(line).map_err(WireError::Decode)
}

pub fn encode_line<T: Serialize>(message: &T) -> Result<String, WireError> {
    let mut encoded = serde_json::to_string(message).map_err(WireError::Encode)?;
    encoded.push('\n');
    Ok(encoded)
}
