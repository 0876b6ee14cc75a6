pub mod client;
pub mod error;
pub mod identity;
pub mod sampler;
pub mod session;
pub mod transport;

pub use client::{OracleClient, OracleSettings};
pub use error::{ClientError, ClientErrorKind};
pub use identity::{FileSystemWallet, Identity, IdentityProvider};
pub use sampler::{FixedRainfallSampler, RainfallSample, RainfallSampler, RandomRainfallSampler};
pub use session::Session;
pub use transport::{
    InProcessConnector, InProcessTransport, LedgerConnector, LedgerTransport,
    UnixSocketConnector, UnixSocketTransport,
};
