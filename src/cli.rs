use std::path::PathBuf;

use anyhow::{Result, anyhow};

/// One binary carries the three processes: the ledger host and the two oracle runs.
/// `--config` is the only flag; everything the oracle publishes comes from the config.
const USAGE: &str = "usage: rainledger <serve|oracle|init-ledger> [--config <path>]
  serve        host the rainfall ledger on its unix socket
  oracle       publish one rainfall sample and read it back
  init-ledger  seed the ledger with the initial district records";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Oracle,
    InitLedger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub config_path: Option<PathBuf>,
}

pub fn invocation_from_args() -> Result<Invocation> {
    parse_args(std::env::args().skip(1))
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation> {
    let mut args = args.into_iter();
    let mut command = None;
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config"))?;
                config_path = Some(PathBuf::from(value));
            }
            "serve" | "oracle" | "init-ledger" if command.is_some() => {
                return Err(anyhow!("more than one command given. {USAGE}"));
            }
            "serve" => command = Some(Command::Serve),
            "oracle" => command = Some(Command::Oracle),
            "init-ledger" => command = Some(Command::InitLedger),
            other => {
                return Err(anyhow!("unknown argument: {other}. {USAGE}"));
            }
        }
    }

    let command = command.ok_or_else(|| anyhow!("missing command. {USAGE}"))?;
    Ok(Invocation {
        command,
        config_path,
    })
}
