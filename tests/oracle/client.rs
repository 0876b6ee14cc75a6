use std::sync::{Arc, atomic::Ordering};

use rainledger::{
    ledger::LedgerErrorKind,
    oracle::{
        ClientErrorKind, FixedRainfallSampler, InProcessConnector, OracleClient, RainfallSample,
        RandomRainfallSampler,
    },
};

use crate::{MemoryWallet, RecordingConnector, admin_identity, settings, welfare_host};

fn sample(district: &str, rainfall: u32) -> Arc<FixedRainfallSampler> {
    Arc::new(FixedRainfallSampler::new(RainfallSample {
        district: district.to_string(),
        rainfall,
        recorded_by: "OracleNode-1".to_string(),
    }))
}

#[tokio::test]
async fn given_seeded_ledger_when_oracle_runs_then_update_is_confirmed_and_session_closed() {
    let host = welfare_host();
    let connector = Arc::new(RecordingConnector::new(Arc::clone(&host)));
    let client = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        connector.clone(),
        sample("pune", 55),
        settings(),
    );

    client
        .run_init_ledger()
        .await
        .expect("seeding should succeed");
    let record = client.run_update().await.expect("oracle run should succeed");

    assert_eq!(record.district, "pune");
    assert_eq!(record.rainfall, 55);
    assert_eq!(record.recorded_by, "OracleNode-1");
    assert!(record.timestamp > "2024-06-01T06:00:00.000Z".to_string());

    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 2);
    assert_eq!(host.height().await, 2);
}

#[tokio::test]
async fn given_missing_identity_when_oracle_runs_then_fails_before_connecting() {
    let host = welfare_host();
    let connector = Arc::new(RecordingConnector::new(Arc::clone(&host)));
    let client = OracleClient::new(
        Arc::new(MemoryWallet::default()),
        connector.clone(),
        sample("pune", 55),
        settings(),
    );

    let err = client
        .run_update()
        .await
        .expect_err("missing identity must fail");
    assert_eq!(err.kind, ClientErrorKind::IdentityMissing);

    let err = client
        .run_init_ledger()
        .await
        .expect_err("missing identity must fail for seeding too");
    assert_eq!(err.kind, ClientErrorKind::IdentityMissing);

    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    assert_eq!(host.height().await, 0);
}

#[tokio::test]
async fn given_unseeded_ledger_when_oracle_runs_then_not_found_aborts_without_retry_and_disconnects()
{
    let host = welfare_host();
    let connector = Arc::new(RecordingConnector::new(Arc::clone(&host)));
    let client = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        connector.clone(),
        sample("pune", 55),
        settings(),
    );

    let err = client
        .run_update()
        .await
        .expect_err("update of absent district must fail");
    assert_eq!(err.kind, ClientErrorKind::TransactionRejected);
    assert_eq!(err.ledger_kind, Some(LedgerErrorKind::NotFound));

    assert_eq!(connector.submits.load(Ordering::SeqCst), 1);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    assert!(host.snapshot_state().await.is_empty());
}

#[tokio::test]
async fn given_sample_for_unknown_district_then_rejected_and_seeded_rows_untouched() {
    let host = welfare_host();
    let seeding = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        Arc::new(InProcessConnector::new(Arc::clone(&host))),
        sample("pune", 0),
        settings(),
    );
    seeding.run_init_ledger().await.expect("seed should succeed");
    let before = host.snapshot_state().await;

    let client = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        Arc::new(InProcessConnector::new(Arc::clone(&host))),
        sample("delhi", 10),
        settings(),
    );
    let err = client
        .run_update()
        .await
        .expect_err("delhi was never seeded");
    assert_eq!(err.ledger_kind, Some(LedgerErrorKind::NotFound));
    assert_eq!(host.snapshot_state().await, before);
}

#[tokio::test]
async fn given_wrong_contract_name_then_rejected_as_unknown_contract() {
    let host = welfare_host();
    let mut wrong = settings();
    wrong.contract = "basic".to_string();
    let client = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        Arc::new(InProcessConnector::new(host)),
        sample("pune", 1),
        wrong,
    );

    let err = client
        .run_init_ledger()
        .await
        .expect_err("contract basic is not deployed");
    assert_eq!(err.ledger_kind, Some(LedgerErrorKind::UnknownContract));
}

#[tokio::test]
async fn given_random_sampler_then_published_value_is_in_range() {
    let host = welfare_host();
    let client = OracleClient::new(
        Arc::new(MemoryWallet::with(admin_identity())),
        Arc::new(InProcessConnector::new(Arc::clone(&host))),
        Arc::new(RandomRainfallSampler::new(
            "mumbai",
            "OracleNode-Primary",
            150,
        )),
        settings(),
    );

    client.run_init_ledger().await.expect("seed should succeed");
    let record = client.run_update().await.expect("oracle run should succeed");
    assert_eq!(record.district, "mumbai");
    assert!(record.rainfall < 150);
    assert_eq!(record.recorded_by, "OracleNode-Primary");
}
