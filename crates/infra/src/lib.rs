//! Infrastructure layer: persistence, locking, configuration and the ledger
//! service that ties them to the pure domain in `kennel-inventory`.

pub mod clock;
pub mod config;
pub mod error;
pub mod locks;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use service::{LedgerService, QuantityChange};
pub use store::{InMemoryLedgerStore, JsonFileLedgerStore, LedgerStore, StoreError};
