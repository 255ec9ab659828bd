use flowbus_schema::ValidationError;
use thiserror::Error;

/// Failures raised by a [`crate::store::LogStoreAdapter`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("group already exists")] GroupExists,
    #[error("backend error: {0}")] Backend(String),
}

/// Failures the event bus raises to a direct caller. Validation failures at
/// consume time never reach here; they are routed to the DLQ instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("backlog item {backlog_item_id} is locked")]
    Locked { backlog_item_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("log entry missing required field {0}")]
    MalformedEntry(String),
}
