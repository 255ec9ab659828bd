use std::collections::HashMap;

use flowbus_types::Envelope;

use crate::errors::BusError;
use crate::event_bus::EventBus;
use crate::store::LogStoreAdapter;

/// A registered event-type handler.
pub type HandlerFn = Box<dyn Fn(&Envelope) -> anyhow::Result<()> + Send + Sync>;

/// Attaches event-type handlers to a bus consumer loop.
///
/// Dispatch looks up the handler by `event_type`; an event type with no
/// registered handler is silently acked rather than dead-lettered. This is
/// deliberate: it lets a service share a partition with others and ignore
/// event types outside its concern without DLQ-ing them.
pub struct ServiceBase<S: LogStoreAdapter> {
    name: String,
    project_id: String,
    bus: EventBus<S>,
    handlers: HashMap<String, HandlerFn>,
}

impl<S: LogStoreAdapter> ServiceBase<S> {
    pub fn new(name: impl Into<String>, project_id: impl Into<String>, bus: EventBus<S>) -> Self {
        ServiceBase {
            name: name.into(),
            project_id: project_id.into(),
            bus,
            handlers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn bus(&self) -> &EventBus<S> {
        &self.bus
    }

    /// Register `handler` for `event_type`.
    pub fn on(
        &mut self,
        event_type: impl Into<String>,
        handler: impl Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        self.handlers.insert(event_type.into(), Box::new(handler));
    }

    /// Dispatch `envelope` to its registered handler, if any. Unregistered
    /// event types are a no-op: the caller's `consume` loop still acks them.
    pub fn handle(&self, envelope: &Envelope) -> anyhow::Result<()> {
        match self.handlers.get(envelope.event_type.as_str()) {
            Some(handler) => handler(envelope),
            None => Ok(()),
        }
    }

    /// Bind this service's dispatch function into one step of
    /// `EventBus::consume`.
    pub fn consume(
        &self,
        group: &str,
        consumer: &str,
        partition: Option<&str>,
    ) -> Result<Option<String>, BusError> {
        self.bus.consume(
            &self.project_id,
            group,
            consumer,
            &|envelope| self.handle(envelope),
            partition,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, GroupStart, PendingEntry};
    use crate::errors::StoreError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct NullStore {
        kv: Arc<Mutex<HashMap<String, String>>>,
    }

    impl LogStoreAdapter for NullStore {
        fn append(&self, _partition: &str, _fields: Fields) -> Result<String, StoreError> {
            Ok("1-0".to_string())
        }
        fn group_create(
            &self,
            _partition: &str,
            _group: &str,
            _starting_point: GroupStart,
            _create_partition: bool,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        fn read_group(
            &self,
            _partition: &str,
            _group: &str,
            _consumer: &str,
            _count: usize,
            _block_ms: u64,
        ) -> Result<Vec<(String, Fields)>, StoreError> {
            Ok(vec![])
        }
        fn ack(&self, _partition: &str, _group: &str, _message_ids: &[String]) -> Result<usize, StoreError> {
            Ok(0)
        }
        fn pending_range(
            &self,
            _partition: &str,
            _group: &str,
            _count: usize,
            _consumer: Option<&str>,
        ) -> Result<Vec<PendingEntry>, StoreError> {
            Ok(vec![])
        }
        fn claim(
            &self,
            _partition: &str,
            _group: &str,
            _new_consumer: &str,
            _min_idle_ms: u64,
            _message_ids: &[String],
        ) -> Result<Vec<(String, Fields)>, StoreError> {
            Ok(vec![])
        }
        fn read(&self, _partition: &str, _start_id: &str, _count: usize) -> Result<Vec<(String, Fields)>, StoreError> {
            Ok(vec![])
        }
        fn kv_set(&self, key: &str, value: &str, _ttl_secs: Option<u64>, if_absent: bool) -> Result<bool, StoreError> {
            let mut kv = self.kv.lock().unwrap();
            if if_absent && kv.contains_key(key) {
                return Ok(false);
            }
            kv.insert(key.to_string(), value.to_string());
            Ok(true)
        }
        fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.kv.lock().unwrap().get(key).cloned())
        }
        fn kv_del(&self, key: &str) -> Result<(), StoreError> {
            self.kv.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn unregistered_event_type_is_a_no_op() {
        let bus = EventBus::new(NullStore::default());
        let mut service = ServiceBase::new("svc", "demo", bus);
        service.on("initial_request", |_env| Ok(()));

        let env = flowbus_types::build_envelope(
            "qa_report",
            "demo",
            "item-1",
            serde_json::json!({"status": "pass"}),
            "c",
            "k",
        );
        assert!(service.handle(&env).is_ok());
    }

    #[test]
    fn registered_event_type_invokes_handler() {
        let bus = EventBus::new(NullStore::default());
        let mut service = ServiceBase::new("svc", "demo", bus);
        let invoked = Arc::new(Mutex::new(false));
        let invoked_clone = invoked.clone();
        service.on("initial_request", move |_env| {
            *invoked_clone.lock().unwrap() = true;
            Ok(())
        });

        let env = flowbus_types::build_envelope(
            "initial_request",
            "demo",
            "item-1",
            serde_json::json!({"summary": "x", "requested_by": "y"}),
            "c",
            "k",
        );
        service.handle(&env).unwrap();
        assert!(*invoked.lock().unwrap());
    }
}
