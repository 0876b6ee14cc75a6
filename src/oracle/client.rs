use std::sync::Arc;

use crate::{
    ledger::{
        contract::{INIT_LEDGER, READ_RAINFALL, UPDATE_RAINFALL},
        record::RainfallRecord,
    },
    oracle::{
        error::{ClientError, malformed_response},
        identity::{IdentityProvider, require_identity},
        sampler::RainfallSampler,
        session::Session,
        transport::LedgerConnector,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
    pub identity: String,
    pub channel: String,
    pub contract: String,
}

/// One-shot oracle runs: publish a fresh sample, or seed the ledger.
pub struct OracleClient {
    identities: Arc<dyn IdentityProvider>,
    connector: Arc<dyn LedgerConnector>,
    sampler: Arc<dyn RainfallSampler>,
    settings: OracleSettings,
}

impl OracleClient {
    pub fn new(
        identities: Arc<dyn IdentityProvider>,
        connector: Arc<dyn LedgerConnector>,
        sampler: Arc<dyn RainfallSampler>,
        settings: OracleSettings,
    ) -> Self {
        Self {
            identities,
            connector,
            sampler,
            settings,
        }
    }

    pub async fn run_update(&self) -> Result<RainfallRecord, ClientError> {
        tracing::info!(target: "oracle", "oracle_started");
        let session = self.open_session().await?;

        let sampler = Arc::clone(&self.sampler);
        let record = session
            .scoped(move |session| Box::pin(publish_and_confirm(session, sampler)))
            .await?;

        tracing::info!(target: "oracle", "oracle_finished");
        Ok(record)
    }

    pub async fn run_init_ledger(&self) -> Result<(), ClientError> {
        tracing::info!(target: "oracle", "init_ledger_started");
        let session = self.open_session().await?;

        session
            .scoped(|session| {
                Box::pin(async move {
                    tracing::info!(target: "oracle", function = INIT_LEDGER, "submitting_transaction");
                    session.submit_transaction(INIT_LEDGER, &[]).await?;
                    tracing::info!(target: "oracle", function = INIT_LEDGER, "transaction_submitted");
                    Ok::<(), ClientError>(())
                })
            })
            .await?;

        tracing::info!(target: "oracle", "init_ledger_finished");
        Ok(())
    }

    async fn open_session(&self) -> Result<Session, ClientError> {
        let identity = require_identity(self.identities.as_ref(), &self.settings.identity)?;
        tracing::info!(
            target: "oracle",
            step = 1,
            identity = %identity.label,
            msp_id = %identity.msp_id,
            "identity_found"
        );

        let transport = self.connector.connect().await?;
        tracing::info!(target: "oracle", step = 2, "gateway_connected");

        let session = Session::connect(
            transport,
            identity,
            self.settings.channel.clone(),
            self.settings.contract.clone(),
        );
        tracing::info!(
            target: "oracle",
            step = 3,
            channel = %self.settings.channel,
            contract = %self.settings.contract,
            "contract_bound"
        );
        Ok(session)
    }
}

async fn publish_and_confirm(
    session: &Session,
    sampler: Arc<dyn RainfallSampler>,
) -> Result<RainfallRecord, ClientError> {
    let sample = sampler.sample();
    tracing::info!(
        target: "oracle",
        step = 4,
        district = %sample.district,
        rainfall = sample.rainfall,
        "off_chain_sample_generated"
    );

    session
        .submit_transaction(
            UPDATE_RAINFALL,
            &[
                sample.district.clone(),
                sample.rainfall.to_string(),
                sample.recorded_by.clone(),
            ],
        )
        .await?;
    tracing::info!(target: "oracle", step = 5, function = UPDATE_RAINFALL, "transaction_submitted");

    let payload = session
        .evaluate_transaction(READ_RAINFALL, std::slice::from_ref(&sample.district))
        .await?;
    let record = RainfallRecord::decode(&payload)
        .map_err(|err| malformed_response(format!("confirmation read returned {err}")))?;
    tracing::info!(
        target: "oracle",
        step = 6,
        district = %record.district,
        rainfall = record.rainfall,
        timestamp = %record.timestamp,
        recorded_by = %record.recorded_by,
        "query_result"
    );

    if record.rainfall != sample.rainfall || record.recorded_by != sample.recorded_by {
        tracing::warn!(
            target: "oracle",
            district = %record.district,
            expected_rainfall = sample.rainfall,
            observed_rainfall = record.rainfall,
            "confirmation_differs_from_submitted_sample"
        );
    }

    Ok(record)
}
