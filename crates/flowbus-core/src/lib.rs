//! The event bus: partitioned log abstraction, consumer-group semantics,
//! deduplication, per-item locking, and the retry/DLQ state machine.

pub mod constants;
mod errors;
mod event_bus;
mod service;
mod store;

pub use errors::{BusError, StoreError};
pub use event_bus::{EventBus, Handler};
pub use service::{HandlerFn, ServiceBase};
pub use store::{Fields, GroupStart, LogStoreAdapter, PendingEntry};
