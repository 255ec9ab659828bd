use flowbus_core::{BusError, EventBus, LogStoreAdapter, ServiceBase};
use flowbus_types::build_envelope;
use serde_json::json;

/// Reports a passing QA check for every received deliverable.
pub struct QaWorker<S: LogStoreAdapter> {
    base: ServiceBase<S>,
}

impl<S: LogStoreAdapter + 'static> QaWorker<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>) -> Self {
        let project_id = project_id.into();
        let mut base = ServiceBase::new("qa_worker", project_id.clone(), bus.clone());

        let proj = project_id.clone();
        base.on("dev_deliverable", move |envelope| {
            let report = build_envelope(
                "qa_report",
                proj.clone(),
                envelope.backlog_item_id.clone(),
                json!({"status": "pass", "notes": "All checks green"}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            bus.publish(&proj, report)?;
            Ok(())
        });

        QaWorker { base }
    }

    pub fn consume(&self, group: &str, consumer: &str) -> Result<Option<String>, BusError> {
        self.base.consume(group, consumer, None)
    }
}
