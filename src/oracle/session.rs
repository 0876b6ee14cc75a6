use std::sync::Arc;

use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::{
    host::{TransactionProposal, transaction_id},
    oracle::{
        error::ClientError,
        identity::Identity,
        transport::LedgerTransport,
    },
};

/// A connected client bound to one identity, channel, and contract.
pub struct Session {
    transport: Arc<dyn LedgerTransport>,
    identity: Identity,
    channel: String,
    contract: String,
}

impl Session {
    pub fn connect(
        transport: Arc<dyn LedgerTransport>,
        identity: Identity,
        channel: impl Into<String>,
        contract: impl Into<String>,
    ) -> Self {
        let session = Self {
            transport,
            identity,
            channel: channel.into(),
            contract: contract.into(),
        };
        tracing::debug!(
            target: "oracle",
            identity = %session.identity.label,
            channel = %session.channel,
            contract = %session.contract,
            "session_connected"
        );
        session
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn submit_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ClientError> {
        let proposal = self.proposal(function, args);
        tracing::debug!(target: "oracle", tx_id = %proposal.tx_id, function = %function, "submitting_transaction");
        self.transport
            .submit(proposal)
            .await?
            .map_err(|err| ClientError::rejected(function, err))
    }

    pub async fn evaluate_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ClientError> {
        let proposal = self.proposal(function, args);
        tracing::debug!(target: "oracle", tx_id = %proposal.tx_id, function = %function, "evaluating_transaction");
        self.transport
            .evaluate(proposal)
            .await?
            .map_err(|err| ClientError::rejected(function, err))
    }

    pub async fn disconnect(self) -> Result<(), ClientError> {
        self.transport.close().await?;
        tracing::debug!(target: "oracle", identity = %self.identity.label, "session_disconnected");
        Ok(())
    }

    /// Runs `body` and then disconnects, whether or not `body` succeeded.
    pub async fn scoped<T, F>(self, body: F) -> Result<T, ClientError>
    where
        F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T, ClientError>>,
    {
        let outcome = body(&self).await;
        let disconnected = self.disconnect().await;

        match (outcome, disconnected) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(disconnect_err)) => {
                tracing::warn!(
                    target: "oracle",
                    error = %disconnect_err,
                    "disconnect_failed_after_error"
                );
                Err(err)
            }
        }
    }

    fn proposal(&self, function: &str, args: &[String]) -> TransactionProposal {
        let creator = self.identity.creator();
        TransactionProposal {
            tx_id: transaction_id(Uuid::new_v4().as_bytes(), &creator),
            channel: self.channel.clone(),
            contract: self.contract.clone(),
            function: function.to_string(),
            args: args.to_vec(),
            creator,
        }
    }
}
