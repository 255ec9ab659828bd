use std::collections::BTreeMap;

use chrono::Utc;
use flowbus_schema::EnvelopeValidator;
use flowbus_types::Envelope;
use serde_json::Value;
use tracing::{info, warn};

use crate::constants::{DEDUPE_TTL_SECS, LOCK_TTL_SECS, MAX_ATTEMPTS, READ_BLOCK_MS, READ_COUNT, RETRY_INTERVAL_MS};
use crate::errors::BusError;
use crate::store::{Fields, GroupStart, LogStoreAdapter};

/// A handler invoked per delivered envelope. Failures are ordinary errors;
/// the bus never propagates them to the consume caller, only retries or
/// dead-letters.
pub type Handler<'a> = dyn Fn(&Envelope) -> anyhow::Result<()> + 'a;

fn entry_fields(envelope: &Envelope) -> serde_json::Result<Fields> {
    let mut fields = BTreeMap::new();
    fields.insert("envelope".to_string(), serde_json::to_string(envelope)?);
    fields.insert("attempt".to_string(), envelope.attempt.to_string());
    Ok(fields)
}

/// Releases a backlog lock on drop, mirroring a scoped `with lock: ...`
/// block: acquired before the handler runs, released on every exit path.
struct LockGuard<'s, S: LogStoreAdapter> {
    store: &'s S,
    lock_key: String,
}

impl<'s, S: LogStoreAdapter> Drop for LockGuard<'s, S> {
    fn drop(&mut self) {
        if let Err(err) = self.store.kv_del(&self.lock_key) {
            warn!(lock_key = %self.lock_key, %err, "failed to release backlog lock");
        }
    }
}

/// Publish, consume-with-group, dedupe, lock, retry, dead-letter, snapshot:
/// the core of the runtime. Generic over the log store so a real streaming
/// backend and an in-memory test double share this one implementation.
#[derive(Clone)]
pub struct EventBus<S: LogStoreAdapter> {
    store: S,
    validator: std::sync::Arc<EnvelopeValidator>,
}

impl<S: LogStoreAdapter> EventBus<S> {
    pub fn new(store: S) -> Self {
        EventBus {
            store,
            validator: std::sync::Arc::new(EnvelopeValidator::new()),
        }
    }

    pub fn stream_name(&self, project_id: &str) -> String {
        format!("proj:{project_id}:events")
    }

    pub fn user_outbox(&self, project_id: &str) -> String {
        format!("proj:{project_id}:user_outbox")
    }

    pub fn dead_letter(&self, project_id: &str) -> String {
        format!("proj:{project_id}:dlq")
    }

    fn dedupe_key(&self, project_id: &str, group: &str, message_id: &str) -> String {
        format!("dedupe:{project_id}:{group}:{message_id}")
    }

    fn lock_key(&self, project_id: &str, backlog_item_id: &str) -> String {
        format!("lock:{project_id}:{backlog_item_id}")
    }

    /// Validate and append an event to the project's main partition.
    /// Assigns `timestamp` if absent; `attempt` is taken from the envelope.
    pub fn publish(&self, project_id: &str, envelope: Envelope) -> Result<String, BusError> {
        self.publish_to(&self.stream_name(project_id), envelope)
    }

    /// Identical to [`Self::publish`] but targets the user outbox partition.
    pub fn publish_user_outbox(&self, project_id: &str, envelope: Envelope) -> Result<String, BusError> {
        self.publish_to(&self.user_outbox(project_id), envelope)
    }

    fn publish_to(&self, partition: &str, mut envelope: Envelope) -> Result<String, BusError> {
        if envelope.timestamp.is_none() {
            envelope.timestamp = Some(Utc::now().to_rfc3339());
        }
        let envelope = self.validator.validate(envelope)?;
        let fields = entry_fields(&envelope)
            .map_err(|e| BusError::MalformedEntry(e.to_string()))?;
        Ok(self.store.append(partition, fields)?)
    }

    /// Idempotent create; the "group already exists" signal is swallowed.
    pub fn ensure_group(&self, project_id: &str, group: &str, partition: Option<&str>) -> Result<(), BusError> {
        let target = partition
            .map(str::to_string)
            .unwrap_or_else(|| self.stream_name(project_id));
        match self.store.group_create(&target, group, GroupStart::Beginning, true) {
            Ok(()) => Ok(()),
            Err(crate::errors::StoreError::GroupExists) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// Reclaim entries idle for at least `RETRY_INTERVAL_MS`, transferring
    /// ownership to `consumer`. Does not itself process anything; the next
    /// `read_group` surfaces reclaimed entries.
    pub fn handle_pending(&self, partition: &str, group: &str, consumer: &str) -> Result<(), BusError> {
        let pending = self.store.pending_range(partition, group, 10, None)?;
        let stuck: Vec<String> = pending
            .into_iter()
            .filter(|entry| entry.idle_ms >= RETRY_INTERVAL_MS)
            .map(|entry| entry.message_id)
            .collect();
        if !stuck.is_empty() {
            self.store
                .claim(partition, group, consumer, RETRY_INTERVAL_MS, &stuck)?;
        }
        Ok(())
    }

    /// Run one step of the consume loop: ensure the group, reclaim stuck
    /// in-flight entries, fetch up to one new entry, and process it to
    /// completion (validate, dedupe, lock, handle, ack/retry/DLQ).
    ///
    /// Returns `Ok(Some(message_id))` for a successfully handled message,
    /// `Ok(None)` when nothing was delivered or the delivered entry was
    /// invalid/duplicate/retried/dead-lettered, and `Err(BusError::Locked)`
    /// when the backlog item's lock could not be acquired (the message
    /// stays pending for a later reclaim).
    pub fn consume(
        &self,
        project_id: &str,
        group: &str,
        consumer: &str,
        handler: &Handler<'_>,
        partition: Option<&str>,
    ) -> Result<Option<String>, BusError> {
        let target = partition
            .map(str::to_string)
            .unwrap_or_else(|| self.stream_name(project_id));
        self.ensure_group(project_id, group, Some(&target))?;
        self.handle_pending(&target, group, consumer)?;

        let delivered = self
            .store
            .read_group(&target, group, consumer, READ_COUNT, READ_BLOCK_MS)?;

        let Some((message_id, fields)) = delivered.into_iter().next() else {
            return Ok(None);
        };

        self.process_entry(project_id, &target, group, &message_id, fields, handler)
    }

    fn process_entry(
        &self,
        project_id: &str,
        target: &str,
        group: &str,
        message_id: &str,
        fields: Fields,
        handler: &Handler<'_>,
    ) -> Result<Option<String>, BusError> {
        let attempt: u32 = fields
            .get("attempt")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        let envelope_json = fields
            .get("envelope")
            .ok_or_else(|| BusError::MalformedEntry("envelope".to_string()))?
            .clone();
        let message_ids = [message_id.to_string()];

        let envelope = match self.validator.parse_and_validate(&envelope_json) {
            Ok(env) => env,
            Err(err) => {
                self.dead_letter_entry(project_id, &envelope_json, &err.to_string(), attempt)?;
                self.store.ack(target, group, &message_ids)?;
                return Ok(None);
            }
        };

        let dedupe_key = self.dedupe_key(project_id, group, message_id);
        if self.store.kv_get(&dedupe_key)?.is_some() {
            self.store.ack(target, group, &message_ids)?;
            return Ok(None);
        }

        let lock_key = self.lock_key(project_id, &envelope.backlog_item_id);
        let acquired = self.store.kv_set(&lock_key, "1", Some(LOCK_TTL_SECS), true)?;
        if !acquired {
            return Err(BusError::Locked {
                backlog_item_id: envelope.backlog_item_id.clone(),
            });
        }
        let _lock = LockGuard {
            store: &self.store,
            lock_key,
        };

        match handler(&envelope) {
            Ok(()) => {
                self.store
                    .kv_set(&dedupe_key, "1", Some(DEDUPE_TTL_SECS), false)?;
                self.store.ack(target, group, &message_ids)?;
                info!(%message_id, event_type = %envelope.event_type, "handled");
                Ok(Some(message_id.to_string()))
            }
            Err(err) => {
                if attempt >= MAX_ATTEMPTS {
                    self.dead_letter_entry(project_id, &envelope_json, &err.to_string(), attempt)?;
                } else {
                    let retry_envelope = envelope.with_incremented_attempt();
                    let retry_fields = entry_fields(&retry_envelope)
                        .map_err(|e| BusError::MalformedEntry(e.to_string()))?;
                    self.store.append(target, retry_fields)?;
                    warn!(%message_id, attempt, error = %err, "handler failed, scheduled retry");
                }
                self.store.ack(target, group, &message_ids)?;
                Ok(None)
            }
        }
    }

    fn dead_letter_entry(
        &self,
        project_id: &str,
        raw_envelope: &str,
        error: &str,
        attempt: u32,
    ) -> Result<String, BusError> {
        let mut fields = BTreeMap::new();
        fields.insert("error".to_string(), error.to_string());
        fields.insert("envelope".to_string(), raw_envelope.to_string());
        fields.insert("attempt".to_string(), attempt.to_string());
        Ok(self.store.append(&self.dead_letter(project_id), fields)?)
    }

    /// Raw read of a project's dead-letter partition, for inspection or
    /// operator tooling. Not part of the consume loop.
    pub fn read_dead_letters(&self, project_id: &str, count: usize) -> Result<Vec<(String, Fields)>, BusError> {
        Ok(self.store.read(&self.dead_letter(project_id), "0", count)?)
    }

    /// Build a `snapshot` envelope from `state` (sourced with fallbacks
    /// `"n/a"`/`"snapshot"`) and publish it to the main partition.
    pub fn emit_snapshot(&self, project_id: &str, state: Value) -> Result<String, BusError> {
        let backlog_item_id = state
            .get("backlog_item_id")
            .and_then(Value::as_str)
            .unwrap_or("n/a")
            .to_string();
        let correlation_id = state
            .get("correlation_id")
            .and_then(Value::as_str)
            .unwrap_or("snapshot")
            .to_string();
        let causation_id = state
            .get("causation_id")
            .and_then(Value::as_str)
            .unwrap_or("snapshot")
            .to_string();
        let envelope = Envelope::new(
            "snapshot",
            project_id,
            backlog_item_id,
            serde_json::json!({ "state": state }),
            correlation_id,
            causation_id,
        );
        self.publish(project_id, envelope)
    }
}
