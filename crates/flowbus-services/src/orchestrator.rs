use flowbus_core::{BusError, EventBus, LogStoreAdapter, ServiceBase};
use flowbus_types::build_envelope;
use serde_json::json;

/// Advances a backlog item through intake, dev hand-off, and completion by
/// reacting to `initial_request`, `user_response`, and `qa_report`.
pub struct Orchestrator<S: LogStoreAdapter> {
    base: ServiceBase<S>,
}

impl<S: LogStoreAdapter + 'static> Orchestrator<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>) -> Self {
        let project_id = project_id.into();
        let mut base = ServiceBase::new("orchestrator", project_id.clone(), bus.clone());

        let proj = project_id.clone();
        let initial_bus = bus.clone();
        base.on("initial_request", move |envelope| {
            let backlog_item_id = envelope.backlog_item_id.clone();
            let created = build_envelope(
                "backlog_item_created",
                proj.clone(),
                backlog_item_id.clone(),
                json!({"backlog_item_id": backlog_item_id, "priority": "high"}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            initial_bus.publish(&proj, created)?;
            Ok(())
        });

        let proj = project_id.clone();
        let response_bus = bus.clone();
        base.on("user_response", move |envelope| {
            let backlog_item_id = envelope.backlog_item_id.clone();
            let ready = build_envelope(
                "ready_for_dev",
                proj.clone(),
                backlog_item_id.clone(),
                json!({"backlog_item_id": backlog_item_id}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            response_bus.publish(&proj, ready)?;
            Ok(())
        });

        let proj = project_id.clone();
        let qa_bus = bus;
        base.on("qa_report", move |envelope| {
            let backlog_item_id = envelope.backlog_item_id.clone();
            let done = build_envelope(
                "work_completed",
                proj.clone(),
                backlog_item_id.clone(),
                json!({"backlog_item_id": backlog_item_id, "status": "done"}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            qa_bus.publish(&proj, done)?;
            Ok(())
        });

        Orchestrator { base }
    }

    pub fn consume(&self, group: &str, consumer: &str) -> Result<Option<String>, BusError> {
        self.base.consume(group, consumer, None)
    }
}
