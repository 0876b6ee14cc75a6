pub mod clock;
pub mod contract;
pub mod error;
pub mod record;
pub mod world_state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::{Contract, RainfallContract, SEED_ROWS, SeedRow};
pub use error::{LedgerError, LedgerErrorKind};
pub use record::RainfallRecord;
pub use world_state::{MemoryWorldState, StagedWorldState, WorldState, WriteSet};
