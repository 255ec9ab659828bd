use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use flowbus_core::{Fields, GroupStart, LogStoreAdapter, PendingEntry, StoreError};

#[derive(Debug, Clone)]
struct StreamEntry {
    message_id: String,
    fields: Fields,
}

#[derive(Debug, Clone)]
struct Pending {
    consumer: String,
    delivered_at: Instant,
}

#[derive(Debug, Default)]
struct GroupState {
    next_index: usize,
    pending: std::collections::HashMap<String, Pending>,
}

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    streams: DashMap<String, Mutex<Vec<StreamEntry>>>,
    groups: DashMap<(String, String), Mutex<GroupState>>,
    kv: DashMap<String, KvEntry>,
}

/// A process-local log store: streams, consumer groups, and a KV surface
/// all live in concurrent maps guarded per-entry, so many service
/// instances can share one `InMemoryLogStore` (cloning it is cheap: it's
/// just an `Arc` bump).
#[derive(Clone, Default)]
pub struct InMemoryLogStore(Arc<Inner>);

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parse the leading sequence number out of a `"<n>-0"` message id, for
/// numeric rather than lexical ordering.
fn message_seq(message_id: &str) -> u64 {
    message_id
        .split('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn kv_live(entry: &KvEntry) -> bool {
    match entry.expires_at {
        Some(at) => Instant::now() < at,
        None => true,
    }
}

impl LogStoreAdapter for InMemoryLogStore {
    fn append(&self, partition: &str, fields: Fields) -> Result<String, StoreError> {
        let stream = self
            .0
            .streams
            .entry(partition.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut stream = stream.lock().unwrap();
        let message_id = format!("{}-0", stream.len() + 1);
        stream.push(StreamEntry {
            message_id: message_id.clone(),
            fields,
        });
        Ok(message_id)
    }

    fn group_create(
        &self,
        partition: &str,
        group: &str,
        starting_point: GroupStart,
        create_partition: bool,
    ) -> Result<(), StoreError> {
        let key = (partition.to_string(), group.to_string());
        if self.0.groups.contains_key(&key) {
            return Err(StoreError::GroupExists);
        }
        if create_partition {
            self.0
                .streams
                .entry(partition.to_string())
                .or_insert_with(|| Mutex::new(Vec::new()));
        }
        let next_index = match starting_point {
            GroupStart::Latest => self
                .0
                .streams
                .get(partition)
                .map(|s| s.lock().unwrap().len())
                .unwrap_or(0),
            GroupStart::Beginning => 0,
        };
        self.0.groups.insert(
            key,
            Mutex::new(GroupState {
                next_index,
                pending: std::collections::HashMap::new(),
            }),
        );
        Ok(())
    }

    fn read_group(
        &self,
        partition: &str,
        group: &str,
        consumer: &str,
        count: usize,
        _block_ms: u64,
    ) -> Result<Vec<(String, Fields)>, StoreError> {
        let key = (partition.to_string(), group.to_string());
        let group_state = self
            .0
            .groups
            .entry(key)
            .or_insert_with(|| Mutex::new(GroupState::default()));
        let mut group_state = group_state.lock().unwrap();
        let stream = self
            .0
            .streams
            .entry(partition.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let stream = stream.lock().unwrap();

        let start = group_state.next_index;
        let end = (start + count).min(stream.len());
        let mut out = Vec::new();
        for entry in &stream[start..end] {
            out.push((entry.message_id.clone(), entry.fields.clone()));
            group_state.pending.insert(
                entry.message_id.clone(),
                Pending {
                    consumer: consumer.to_string(),
                    delivered_at: Instant::now(),
                },
            );
        }
        group_state.next_index = end;
        Ok(out)
    }

    fn ack(&self, partition: &str, group: &str, message_ids: &[String]) -> Result<usize, StoreError> {
        let key = (partition.to_string(), group.to_string());
        let Some(group_state) = self.0.groups.get(&key) else {
            return Ok(0);
        };
        let mut group_state = group_state.lock().unwrap();
        let mut acked = 0;
        for id in message_ids {
            if group_state.pending.remove(id).is_some() {
                acked += 1;
            }
        }
        Ok(acked)
    }

    fn pending_range(
        &self,
        partition: &str,
        group: &str,
        count: usize,
        consumer: Option<&str>,
    ) -> Result<Vec<PendingEntry>, StoreError> {
        let key = (partition.to_string(), group.to_string());
        let Some(group_state) = self.0.groups.get(&key) else {
            return Ok(vec![]);
        };
        let group_state = group_state.lock().unwrap();
        let now = Instant::now();
        let mut out: Vec<PendingEntry> = group_state
            .pending
            .iter()
            .filter(|(_, p)| consumer.map(|c| c == p.consumer).unwrap_or(true))
            .map(|(message_id, p)| PendingEntry {
                message_id: message_id.clone(),
                consumer: p.consumer.clone(),
                idle_ms: now.saturating_duration_since(p.delivered_at).as_millis() as u64,
            })
            .collect();
        out.sort_by_key(|entry| message_seq(&entry.message_id));
        out.truncate(count);
        Ok(out)
    }

    fn claim(
        &self,
        partition: &str,
        group: &str,
        new_consumer: &str,
        min_idle_ms: u64,
        message_ids: &[String],
    ) -> Result<Vec<(String, Fields)>, StoreError> {
        let key = (partition.to_string(), group.to_string());
        let Some(group_state) = self.0.groups.get(&key) else {
            return Ok(vec![]);
        };
        let mut group_state = group_state.lock().unwrap();
        let stream = self
            .0
            .streams
            .get(partition)
            .map(|s| s.lock().unwrap().clone())
            .unwrap_or_default();
        let now = Instant::now();

        let mut reclaimed = Vec::new();
        for message_id in message_ids {
            let idle_ok = group_state
                .pending
                .get(message_id)
                .map(|p| now.saturating_duration_since(p.delivered_at).as_millis() as u64 >= min_idle_ms)
                .unwrap_or(false);
            if !idle_ok {
                continue;
            }
            if let Some(entry) = stream.iter().find(|e| &e.message_id == message_id) {
                group_state.pending.insert(
                    message_id.clone(),
                    Pending {
                        consumer: new_consumer.to_string(),
                        delivered_at: now,
                    },
                );
                reclaimed.push((entry.message_id.clone(), entry.fields.clone()));
            }
        }
        Ok(reclaimed)
    }

    fn read(&self, partition: &str, start_id: &str, count: usize) -> Result<Vec<(String, Fields)>, StoreError> {
        let stream = self
            .0
            .streams
            .get(partition)
            .map(|s| s.lock().unwrap().clone())
            .unwrap_or_default();
        let start_index = if start_id == "0" {
            0
        } else {
            stream.len()
        };
        let end = (start_index + count).min(stream.len());
        let slice = if start_index <= stream.len() {
            &stream[start_index..end]
        } else {
            &[]
        };
        Ok(slice
            .iter()
            .map(|e| (e.message_id.clone(), e.fields.clone()))
            .collect())
    }

    fn kv_set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
        if_absent: bool,
    ) -> Result<bool, StoreError> {
        if if_absent {
            if let Some(existing) = self.0.kv.get(key) {
                if kv_live(&existing) {
                    return Ok(false);
                }
            }
        }
        let expires_at = ttl_secs.map(|s| Instant::now() + Duration::from_secs(s));
        self.0.kv.insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.0.kv.get(key) {
            Some(entry) if kv_live(&entry) => Ok(Some(entry.value.clone())),
            Some(_) => {
                self.0.kv.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn kv_del(&self, key: &str) -> Result<(), StoreError> {
        self.0.kv.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fields(envelope: &str, attempt: u32) -> Fields {
        let mut f = BTreeMap::new();
        f.insert("envelope".to_string(), envelope.to_string());
        f.insert("attempt".to_string(), attempt.to_string());
        f
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let store = InMemoryLogStore::new();
        let id1 = store.append("p", fields("a", 1)).unwrap();
        let id2 = store.append("p", fields("b", 1)).unwrap();
        assert_eq!(id1, "1-0");
        assert_eq!(id2, "2-0");
    }

    #[test]
    fn group_create_twice_signals_group_exists() {
        let store = InMemoryLogStore::new();
        store
            .group_create("p", "g", GroupStart::Latest, true)
            .unwrap();
        let err = store
            .group_create("p", "g", GroupStart::Latest, true)
            .unwrap_err();
        assert_eq!(err, StoreError::GroupExists);
    }

    #[test]
    fn read_group_delivers_new_entries_and_tracks_pending() {
        let store = InMemoryLogStore::new();
        store.append("p", fields("a", 1)).unwrap();
        store
            .group_create("p", "g", GroupStart::Beginning, true)
            .unwrap();
        let delivered = store.read_group("p", "g", "c1", 10, 0).unwrap();
        assert_eq!(delivered.len(), 1);

        let pending = store.pending_range("p", "g", 10, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].consumer, "c1");
    }

    #[test]
    fn ack_removes_from_pending() {
        let store = InMemoryLogStore::new();
        store.append("p", fields("a", 1)).unwrap();
        store
            .group_create("p", "g", GroupStart::Beginning, true)
            .unwrap();
        let delivered = store.read_group("p", "g", "c1", 10, 0).unwrap();
        let ids: Vec<String> = delivered.into_iter().map(|(id, _)| id).collect();
        let acked = store.ack("p", "g", &ids).unwrap();
        assert_eq!(acked, 1);
        assert!(store.pending_range("p", "g", 10, None).unwrap().is_empty());
    }

    #[test]
    fn pending_range_orders_by_numeric_sequence_past_nine_entries() {
        let store = InMemoryLogStore::new();
        store
            .group_create("p", "g", GroupStart::Beginning, true)
            .unwrap();
        for i in 0..11 {
            store.append("p", fields(&format!("entry-{i}"), 1)).unwrap();
        }
        let delivered = store.read_group("p", "g", "c1", 11, 0).unwrap();
        assert_eq!(delivered.len(), 11);

        let pending = store.pending_range("p", "g", 10, None).unwrap();
        assert_eq!(pending.len(), 10);
        let ids: Vec<u64> = pending.iter().map(|p| message_seq(&p.message_id)).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&10));
    }

    #[test]
    fn kv_set_if_absent_rejects_existing_key() {
        let store = InMemoryLogStore::new();
        assert!(store.kv_set("k", "v1", None, true).unwrap());
        assert!(!store.kv_set("k", "v2", None, true).unwrap());
        assert_eq!(store.kv_get("k").unwrap(), Some("v1".to_string()));
    }

    #[test]
    fn kv_del_clears_key() {
        let store = InMemoryLogStore::new();
        store.kv_set("k", "v", None, false).unwrap();
        store.kv_del("k").unwrap();
        assert_eq!(store.kv_get("k").unwrap(), None);
    }
}
