use std::collections::BTreeMap;

use crate::errors::StoreError;

/// Where a newly created consumer group should start reading from.
///
/// Mirrors the two cursor sentinels a streaming log typically accepts:
/// "only entries appended from here on" versus "replay from the start of
/// the partition".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStart {
    Latest,
    Beginning,
}

/// A delivered-but-unacknowledged entry, as reported by `pending_range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub message_id: String,
    pub consumer: String,
    pub idle_ms: u64,
}

/// The fields carried by one log entry: `envelope` (serialized JSON) and
/// `attempt` (decimal string), per the data model. Kept as an ordered map
/// rather than a fixed struct so adapters can pass through whatever a real
/// streaming log hands back without an intermediate conversion.
pub type Fields = BTreeMap<String, String>;

/// Abstracts a partitioned, ordered, durable log with consumer-group
/// semantics. The bus depends on no other detail of the underlying store.
///
/// Implementations are expected to be cheaply cloneable (e.g. wrapping an
/// `Arc` or a pooled connection) so a single adapter instance can back
/// multiple services concurrently.
pub trait LogStoreAdapter: Clone + Send + Sync {
    /// Append `fields` to `partition`, creating it lazily. Returns the
    /// assigned, monotonically increasing message id.
    fn append(&self, partition: &str, fields: Fields) -> Result<String, StoreError>;

    /// Idempotently create `group` on `partition`. Implementations MUST
    /// return `StoreError::GroupExists` (never propagate a generic error)
    /// when the group is already present, so callers can swallow it.
    fn group_create(
        &self,
        partition: &str,
        group: &str,
        starting_point: GroupStart,
        create_partition: bool,
    ) -> Result<(), StoreError>;

    /// Deliver up to `count` new entries to `consumer`, marking each
    /// pending with a delivery timestamp of now. Blocks for up to
    /// `block_ms` if nothing is immediately available.
    fn read_group(
        &self,
        partition: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<(String, Fields)>, StoreError>;

    /// Remove `message_ids` from the group's pending set. Returns the
    /// number actually removed.
    fn ack(&self, partition: &str, group: &str, message_ids: &[String]) -> Result<usize, StoreError>;

    /// Enumerate in-flight entries for `group`, optionally filtered to one
    /// consumer.
    fn pending_range(
        &self,
        partition: &str,
        group: &str,
        count: usize,
        consumer: Option<&str>,
    ) -> Result<Vec<PendingEntry>, StoreError>;

    /// Transfer ownership of `message_ids` to `new_consumer`, resetting
    /// their delivery timestamp, for entries whose idle time is at least
    /// `min_idle_ms`.
    fn claim(
        &self,
        partition: &str,
        group: &str,
        new_consumer: &str,
        min_idle_ms: u64,
        message_ids: &[String],
    ) -> Result<Vec<(String, Fields)>, StoreError>;

    /// Raw tail read with no group semantics, for inspection or DLQ
    /// draining. `start_id` of `"0"` reads from the beginning.
    fn read(&self, partition: &str, start_id: &str, count: usize) -> Result<Vec<(String, Fields)>, StoreError>;

    /// Set `key` to `value`. If `if_absent`, the write is skipped (and
    /// `false` returned) when the key is already present. `ttl_secs`
    /// expiry is eventual from the caller's perspective.
    fn kv_set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
        if_absent: bool,
    ) -> Result<bool, StoreError>;

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn kv_del(&self, key: &str) -> Result<(), StoreError>;
}
