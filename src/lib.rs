pub mod cli;
pub mod config;
pub mod host;
pub mod ledger;
pub mod logging;
pub mod oracle;
pub mod server;
pub mod wire;
