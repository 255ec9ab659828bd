use flowbus_core::{BusError, EventBus, LogStoreAdapter, ServiceBase};
use flowbus_types::build_envelope;
use serde_json::json;

/// Asks a clarifying question onto the user outbox whenever a backlog item
/// is created.
pub struct Clarification<S: LogStoreAdapter> {
    base: ServiceBase<S>,
}

impl<S: LogStoreAdapter + 'static> Clarification<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>) -> Self {
        let project_id = project_id.into();
        let mut base = ServiceBase::new("clarification", project_id.clone(), bus.clone());

        let proj = project_id.clone();
        base.on("backlog_item_created", move |envelope| {
            let backlog_item_id = envelope.backlog_item_id.clone();
            let assignee = envelope
                .payload
                .get("requested_by")
                .and_then(|v| v.as_str())
                .unwrap_or("user")
                .to_string();
            let question = build_envelope(
                "clarification_needed",
                proj.clone(),
                backlog_item_id,
                json!({"question": "What is the acceptance criteria?", "assignee": assignee}),
                envelope.correlation_id.clone(),
                envelope.causation_id.clone(),
            );
            bus.publish_user_outbox(&proj, question)?;
            Ok(())
        });

        Clarification { base }
    }

    pub fn consume(&self, group: &str, consumer: &str) -> Result<Option<String>, BusError> {
        self.base.consume(group, consumer, None)
    }
}
