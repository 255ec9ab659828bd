use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowbus_core::{BusError, EventBus, LogStoreAdapter, ServiceBase};
use flowbus_types::build_envelope;
use serde_json::json;

/// Builds the deliverable for a backlog item once it's ready for dev.
///
/// `failure_mode` makes every invocation fail, incrementing a per-item
/// counter used to exercise the retry/DLQ path in tests and the demo CLI.
pub struct DevWorker<S: LogStoreAdapter> {
    base: ServiceBase<S>,
    fail_counts: Arc<Mutex<HashMap<String, u32>>>,
}

impl<S: LogStoreAdapter + 'static> DevWorker<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>, failure_mode: bool) -> Self {
        let project_id = project_id.into();
        let mut base = ServiceBase::new("dev_worker", project_id.clone(), bus.clone());
        let fail_counts: Arc<Mutex<HashMap<String, u32>>> = Arc::new(Mutex::new(HashMap::new()));

        let proj = project_id.clone();
        let counts = fail_counts.clone();
        base.on("ready_for_dev", move |envelope| {
            let backlog_item_id = envelope.backlog_item_id.clone();
            if failure_mode {
                let mut counts = counts.lock().unwrap();
                let attempts = counts.entry(backlog_item_id.clone()).or_insert(0);
                *attempts += 1;
                anyhow::bail!("forced failure for {backlog_item_id} attempt {attempts}");
            }

            let deliverable = build_envelope(
                "dev_deliverable",
                proj.clone(),
                backlog_item_id,
                json!({"description": "Implementation complete", "artifact": "artifact.tar.gz"}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            bus.publish(&proj, deliverable)?;
            Ok(())
        });

        DevWorker { base, fail_counts }
    }

    pub fn fail_count(&self, backlog_item_id: &str) -> u32 {
        self.fail_counts
            .lock()
            .unwrap()
            .get(backlog_item_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn consume(&self, group: &str, consumer: &str) -> Result<Option<String>, BusError> {
        self.base.consume(group, consumer, None)
    }
}
