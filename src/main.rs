use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use rainledger::{
    cli::{Command, invocation_from_args},
    config::Config,
    host::{LedgerHost, LedgerPersistence},
    ledger::{RainfallContract, SystemClock},
    logging::init_tracing,
    oracle::{
        FileSystemWallet, OracleClient, OracleSettings, RandomRainfallSampler,
        UnixSocketConnector,
    },
    server::LedgerServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = invocation_from_args()?;
    let config = Config::load_or_default(invocation.config_path.as_deref())
        .context("failed to load config")?;
    let logging = init_tracing(&config.logging)?;
    tracing::debug!(target: "main", run_id = %logging.run_id(), command = ?invocation.command, "starting");

    let result = match invocation.command {
        Command::Serve => serve(&config).await,
        Command::Oracle => run_oracle(&config).await,
        Command::InitLedger => run_init_ledger(&config).await,
    };

    if let Err(err) = &result {
        tracing::error!(target: "main", error = %format!("{err:#}"), "run_failed");
    }
    result
}

async fn serve(config: &Config) -> Result<()> {
    let contract = Arc::new(RainfallContract::new(
        config.ledger.contract.clone(),
        Arc::new(SystemClock),
    ));
    let host = LedgerHost::open(
        config.ledger.channel.clone(),
        contract,
        LedgerPersistence::new(config.ledger.state_path.clone()),
    )
    .context("failed to open ledger state")?;
    let server = LedgerServer::new(config.ledger.socket_path.clone(), Arc::new(host));

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server_task = tokio::spawn(async move { server.run(server_shutdown).await });

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(target: "main", signal = signal_name, "shutdown_requested");
    shutdown.cancel();
    server_task.await.context("ledger server task join failed")??;
    Ok(())
}

fn oracle_client(config: &Config) -> OracleClient {
    OracleClient::new(
        Arc::new(FileSystemWallet::new(config.oracle.wallet_dir.clone())),
        Arc::new(UnixSocketConnector::new(config.ledger.socket_path.clone())),
        Arc::new(RandomRainfallSampler::new(
            config.oracle.district.clone(),
            config.oracle.recorded_by.clone(),
            config.oracle.max_rainfall_mm,
        )),
        OracleSettings {
            identity: config.oracle.identity.clone(),
            channel: config.ledger.channel.clone(),
            contract: config.ledger.contract.clone(),
        },
    )
}

async fn run_oracle(config: &Config) -> Result<()> {
    let record = oracle_client(config)
        .run_update()
        .await
        .context("failed to submit transaction")?;
    let rendered = serde_json::to_string(&record).context("failed to render query result")?;
    tracing::info!(target: "main", result = %rendered, "oracle_run_complete");
    Ok(())
}

async fn run_init_ledger(config: &Config) -> Result<()> {
    oracle_client(config)
        .run_init_ledger()
        .await
        .context("failed to initialize ledger")?;
    tracing::info!(target: "main", "ledger_initialized");
    Ok(())
}
