use std::{fs, sync::Arc};

use rainledger::{
    host::{Creator, LedgerHost, LedgerPersistence, TransactionProposal},
    ledger::{LedgerErrorKind, RainfallRecord},
};
use uuid::Uuid;

use crate::welfare_contract;

fn admin() -> Creator {
    Creator {
        msp_id: "Org1MSP".to_string(),
        label: "admin".to_string(),
    }
}

fn proposal(function: &str, args: &[&str]) -> TransactionProposal {
    TransactionProposal {
        tx_id: Uuid::new_v4().to_string(),
        channel: "mychannel".to_string(),
        contract: "welfare".to_string(),
        function: function.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
        creator: admin(),
    }
}

fn host() -> LedgerHost {
    let (contract, _clock) = welfare_contract();
    LedgerHost::new("mychannel", Arc::new(contract))
}

#[tokio::test]
async fn given_failed_update_then_committed_state_and_height_are_unchanged() {
    let host = host();
    host.submit(proposal("InitLedger", &[]))
        .await
        .expect("seed should commit");
    let state_before = host.snapshot_state().await;
    let height_before = host.height().await;

    let err = host
        .submit(proposal("UpdateRainfall", &["delhi", "10", "X"]))
        .await
        .expect_err("unknown district must be rejected");
    assert_eq!(err.kind, LedgerErrorKind::NotFound);

    let err = host
        .submit(proposal("UpdateRainfall", &["pune", "-4", "X"]))
        .await
        .expect_err("negative rainfall must be rejected");
    assert_eq!(err.kind, LedgerErrorKind::MalformedInput);

    assert_eq!(host.snapshot_state().await, state_before);
    assert_eq!(host.height().await, height_before);

    let payload = host
        .evaluate(proposal("ReadRainfall", &["pune"]))
        .await
        .expect("pune is readable");
    let record = RainfallRecord::decode(&payload).expect("payload decodes");
    assert_eq!(record.rainfall, 78);
}

#[tokio::test]
async fn given_evaluate_of_update_then_nothing_is_committed() {
    let host = host();
    host.submit(proposal("InitLedger", &[]))
        .await
        .expect("seed should commit");

    let payload = host
        .evaluate(proposal("UpdateRainfall", &["pune", "1", "Dry-Run"]))
        .await
        .expect("simulation should succeed");
    assert_eq!(
        RainfallRecord::decode(&payload).expect("decodes").rainfall,
        1
    );

    let payload = host
        .evaluate(proposal("ReadRainfall", &["pune"]))
        .await
        .expect("pune is readable");
    assert_eq!(
        RainfallRecord::decode(&payload).expect("decodes").rainfall,
        78
    );
    assert_eq!(host.height().await, 1);
}

#[tokio::test]
async fn given_committed_transactions_then_commit_log_records_keys_in_order() {
    let host = host();
    let seed = proposal("InitLedger", &[]);
    let seed_id = seed.tx_id.clone();
    host.submit(seed).await.expect("seed should commit");
    host.submit(proposal("UpdateRainfall", &["mumbai", "90", "OracleNode-2"]))
        .await
        .expect("update should commit");

    let log = host.commit_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].seq_no, 1);
    assert_eq!(log[0].tx_id, seed_id);
    assert_eq!(log[0].keys, vec!["mumbai".to_string(), "pune".to_string()]);
    assert_eq!(log[0].creator, "Org1MSP/admin");
    assert_eq!(log[1].seq_no, 2);
    assert_eq!(log[1].keys, vec!["mumbai".to_string()]);
}

#[tokio::test]
async fn given_replayed_transaction_id_then_second_submit_is_rejected() {
    let host = host();
    let seed = proposal("InitLedger", &[]);
    host.submit(seed.clone()).await.expect("seed should commit");

    let err = host
        .submit(seed)
        .await
        .expect_err("replayed tx id must be rejected");
    assert_eq!(err.kind, LedgerErrorKind::MalformedInput);
    assert_eq!(host.height().await, 1);
}

#[tokio::test]
async fn given_proposal_for_other_channel_contract_or_anonymous_then_rejected() {
    let host = host();

    let mut other_channel = proposal("InitLedger", &[]);
    other_channel.channel = "otherchannel".to_string();
    let err = host.submit(other_channel).await.expect_err("wrong channel");
    assert_eq!(err.kind, LedgerErrorKind::UnknownChannel);

    let mut other_contract = proposal("InitLedger", &[]);
    other_contract.contract = "basic".to_string();
    let err = host.submit(other_contract).await.expect_err("wrong contract");
    assert_eq!(err.kind, LedgerErrorKind::UnknownContract);

    let mut anonymous = proposal("InitLedger", &[]);
    anonymous.creator.label = String::new();
    let err = host.submit(anonymous).await.expect_err("no identity");
    assert_eq!(err.kind, LedgerErrorKind::Unauthorized);

    assert_eq!(host.height().await, 0);
}

#[tokio::test]
async fn given_concurrent_updates_to_one_district_then_each_commits_in_some_order() {
    let host = Arc::new(host());
    host.submit(proposal("InitLedger", &[]))
        .await
        .expect("seed should commit");

    let mut tasks = Vec::new();
    for value in 0..16 {
        let host = Arc::clone(&host);
        tasks.push(tokio::spawn(async move {
            host.submit(proposal(
                "UpdateRainfall",
                &["pune", value.to_string().as_str(), "OracleNode-Swarm"],
            ))
            .await
        }));
    }
    for task in tasks {
        task.await
            .expect("task should join")
            .expect("update should commit");
    }

    assert_eq!(host.height().await, 17);
    let payload = host
        .evaluate(proposal("ReadRainfall", &["pune"]))
        .await
        .expect("pune is readable");
    let record = RainfallRecord::decode(&payload).expect("payload decodes");
    assert!(record.rainfall < 16);
    assert_eq!(record.recorded_by, "OracleNode-Swarm");
}

#[tokio::test]
async fn given_persistent_host_when_reopened_then_committed_state_survives() {
    let dir = std::env::temp_dir().join(format!("rainledger-host-test-{}", Uuid::now_v7()));
    let state_path = dir.join("ledger.json");

    {
        let (contract, _clock) = welfare_contract();
        let host = LedgerHost::open(
            "mychannel",
            Arc::new(contract),
            LedgerPersistence::new(state_path.clone()),
        )
        .expect("host should open");
        host.submit(proposal("InitLedger", &[]))
            .await
            .expect("seed should commit");
        host.submit(proposal("UpdateRainfall", &["pune", "55", "OracleNode-1"]))
            .await
            .expect("update should commit");
    }

    let (contract, _clock) = welfare_contract();
    let reopened = LedgerHost::open(
        "mychannel",
        Arc::new(contract),
        LedgerPersistence::new(state_path.clone()),
    )
    .expect("host should reopen");

    assert_eq!(reopened.height().await, 2);
    let payload = reopened
        .evaluate(proposal("ReadRainfall", &["pune"]))
        .await
        .expect("pune survives restart");
    let record = RainfallRecord::decode(&payload).expect("payload decodes");
    assert_eq!(record.rainfall, 55);
    assert_eq!(record.recorded_by, "OracleNode-1");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_snapshot_save_fails_then_nothing_commits_and_tx_id_stays_usable() {
    let dir = std::env::temp_dir().join(format!("rainledger-host-test-{}", Uuid::now_v7()));
    let state_path = dir.join("ledger.json");
    let (contract, _clock) = welfare_contract();
    let host = LedgerHost::open(
        "mychannel",
        Arc::new(contract),
        LedgerPersistence::new(state_path.clone()),
    )
    .expect("host should open");

    let blocker = state_path.with_extension("tmp");
    fs::create_dir_all(&blocker).expect("blocker dir");

    let seed = proposal("InitLedger", &[]);
    let err = host
        .submit(seed.clone())
        .await
        .expect_err("save cannot create its temp file");
    assert_eq!(err.kind, LedgerErrorKind::Storage);
    assert_eq!(host.height().await, 0);
    assert!(host.snapshot_state().await.is_empty());

    fs::remove_dir(&blocker).expect("remove blocker");
    host.submit(seed).await.expect("same tx id commits once save works");
    assert_eq!(host.height().await, 1);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_reopened_host_then_transaction_ids_from_before_restart_are_still_rejected() {
    let dir = std::env::temp_dir().join(format!("rainledger-host-test-{}", Uuid::now_v7()));
    let state_path = dir.join("ledger.json");
    let seed = proposal("InitLedger", &[]);

    {
        let (contract, _clock) = welfare_contract();
        let host = LedgerHost::open(
            "mychannel",
            Arc::new(contract),
            LedgerPersistence::new(state_path.clone()),
        )
        .expect("host should open");
        host.submit(seed.clone()).await.expect("seed should commit");
    }

    let (contract, _clock) = welfare_contract();
    let reopened = LedgerHost::open(
        "mychannel",
        Arc::new(contract),
        LedgerPersistence::new(state_path),
    )
    .expect("host should reopen");
    let err = reopened
        .submit(seed)
        .await
        .expect_err("replay across restart must be rejected");
    assert_eq!(err.kind, LedgerErrorKind::MalformedInput);
    assert_eq!(reopened.height().await, 1);

    let _ = fs::remove_dir_all(&dir);
}
