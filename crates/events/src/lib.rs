//! Ledger events and notification fan-out.
//!
//! - [`Event`]: the contract every audit record fulfils.
//! - [`EventBus`]: publish/subscribe so badge, alert and view code can react to
//!   ledger changes without wrapping the mutation entry points.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
