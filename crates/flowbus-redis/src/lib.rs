//! A [`flowbus_core::LogStoreAdapter`] backed by a real Redis server,
//! using streams (`XADD`/`XGROUP`/`XREADGROUP`/`XACK`/`XPENDING`/`XCLAIM`)
//! for partitions and plain keys for the dedupe/lock KV surface.

use std::sync::{Arc, Mutex};

use flowbus_core::{Fields, GroupStart, LogStoreAdapter, PendingEntry, StoreError};
use redis::streams::{
    StreamClaimOptions, StreamClaimReply, StreamReadOptions, StreamReadReply,
};
use redis::{Client, Commands, ExistenceCheck, RedisError, SetExpiry, SetOptions, Value};

fn to_store_error(err: RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn decode_field_value(value: &Value) -> String {
    match value {
        Value::Data(bytes) => String::from_utf8_lossy(bytes).to_string(),
        Value::Status(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

/// Wraps a single pooled connection behind a mutex so the adapter stays
/// cheaply `Clone`, matching the bound `LogStoreAdapter` requires.
#[derive(Clone)]
pub struct RedisLogStore {
    conn: Arc<Mutex<redis::Connection>>,
}

impl RedisLogStore {
    pub fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(to_store_error)?;
        let conn = client.get_connection().map_err(to_store_error)?;
        Ok(RedisLogStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl LogStoreAdapter for RedisLogStore {
    fn append(&self, partition: &str, fields: Fields) -> Result<String, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let items: Vec<(String, String)> = fields.into_iter().collect();
        conn.xadd(partition, "*", &items).map_err(to_store_error)
    }

    fn group_create(
        &self,
        partition: &str,
        group: &str,
        starting_point: GroupStart,
        create_partition: bool,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let start_id = match starting_point {
            GroupStart::Latest => "$",
            GroupStart::Beginning => "0",
        };
        let result: Result<(), RedisError> = if create_partition {
            conn.xgroup_create_mkstream(partition, group, start_id)
        } else {
            conn.xgroup_create(partition, group, start_id)
        };
        result.map_err(|err| {
            if err.to_string().contains("BUSYGROUP") {
                StoreError::GroupExists
            } else {
                to_store_error(err)
            }
        })
    }

    fn read_group(
        &self,
        partition: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<(String, Fields)>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(count)
            .block(block_ms as usize);
        let reply: StreamReadReply = conn
            .xread_options(&[partition], &[">"], &opts)
            .map_err(to_store_error)?;

        let mut out = Vec::new();
        for key in reply.keys {
            for id in key.ids {
                let mut fields = Fields::new();
                for (field, value) in id.map {
                    fields.insert(field, decode_field_value(&value));
                }
                out.push((id.id, fields));
            }
        }
        Ok(out)
    }

    fn ack(&self, partition: &str, group: &str, message_ids: &[String]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        conn.xack(partition, group, message_ids).map_err(to_store_error)
    }

    fn pending_range(
        &self,
        partition: &str,
        group: &str,
        count: usize,
        consumer: Option<&str>,
    ) -> Result<Vec<PendingEntry>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let reply: redis::streams::StreamPendingCountReply = match consumer {
            Some(c) => conn
                .xpending_consumer_count(partition, group, "-", "+", count as isize, c)
                .map_err(to_store_error)?,
            None => conn
                .xpending_count(partition, group, "-", "+", count as isize)
                .map_err(to_store_error)?,
        };
        Ok(reply
            .ids
            .into_iter()
            .map(|entry| PendingEntry {
                message_id: entry.id,
                consumer: entry.consumer,
                idle_ms: entry.time_since_delivered as u64,
            })
            .collect())
    }

    fn claim(
        &self,
        partition: &str,
        group: &str,
        new_consumer: &str,
        min_idle_ms: u64,
        message_ids: &[String],
    ) -> Result<Vec<(String, Fields)>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let opts = StreamClaimOptions::default();
        let reply: StreamClaimReply = conn
            .xclaim_options(partition, group, new_consumer, min_idle_ms as usize, message_ids, opts)
            .map_err(to_store_error)?;

        Ok(reply
            .ids
            .into_iter()
            .map(|id| {
                let mut fields = Fields::new();
                for (field, value) in id.map {
                    fields.insert(field, decode_field_value(&value));
                }
                (id.id, fields)
            })
            .collect())
    }

    fn read(&self, partition: &str, start_id: &str, count: usize) -> Result<Vec<(String, Fields)>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let opts = StreamReadOptions::default().count(count);
        let reply: StreamReadReply = conn
            .xread_options(&[partition], &[start_id], &opts)
            .map_err(to_store_error)?;

        let mut out = Vec::new();
        for key in reply.keys {
            for id in key.ids {
                let mut fields = Fields::new();
                for (field, value) in id.map {
                    fields.insert(field, decode_field_value(&value));
                }
                out.push((id.id, fields));
            }
        }
        Ok(out)
    }

    fn kv_set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
        if_absent: bool,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let mut opts = SetOptions::default();
        if if_absent {
            opts = opts.conditional_set(ExistenceCheck::NX);
        }
        if let Some(ttl) = ttl_secs {
            opts = opts.with_expiration(SetExpiry::EX(ttl as usize));
        }
        let result: Option<String> = conn.set_options(key, value, opts).map_err(to_store_error)?;
        Ok(result.is_some())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        conn.get(key).map_err(to_store_error)
    }

    fn kv_del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let _: usize = conn.del(key).map_err(to_store_error)?;
        Ok(())
    }
}
