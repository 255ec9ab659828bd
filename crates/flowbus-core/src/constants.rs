//! Configuration constants governing retry, locking, and dedupe windows.
//! See the component design notes for why each default was chosen.

/// DLQ threshold; strictly `>=`.
pub const MAX_ATTEMPTS: u32 = 5;

/// Reclaim-pending idle threshold, in milliseconds.
pub const RETRY_INTERVAL_MS: u64 = 1000;

/// Upper bound, in seconds, on a single handler invocation.
pub const LOCK_TTL_SECS: u64 = 30;

/// Window, in seconds, during which a successful delivery suppresses
/// re-invocation of the handler for the same message id.
pub const DEDUPE_TTL_SECS: u64 = 3600;

/// Entries requested per `read_group` call.
pub const READ_COUNT: usize = 1;

/// Server-side long-poll duration, in milliseconds.
pub const READ_BLOCK_MS: u64 = 1000;
