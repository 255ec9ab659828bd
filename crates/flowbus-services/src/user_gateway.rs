use flowbus_core::{BusError, EventBus, LogStoreAdapter};
use flowbus_types::build_envelope;
use serde_json::json;

/// The human-facing edge of the pipeline: submits new work and answers
/// clarifying questions off the user outbox. Unlike the other services it
/// has no event-type dispatch table: it drives the bus directly.
pub struct UserGateway<S: LogStoreAdapter> {
    project_id: String,
    bus: EventBus<S>,
}

impl<S: LogStoreAdapter> UserGateway<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>) -> Self {
        UserGateway {
            project_id: project_id.into(),
            bus,
        }
    }

    /// Publish the `initial_request` that kicks off a backlog item.
    pub fn submit_initial(
        &self,
        backlog_item_id: &str,
        summary: &str,
        requested_by: &str,
    ) -> Result<String, BusError> {
        let envelope = build_envelope(
            "initial_request",
            self.project_id.clone(),
            backlog_item_id,
            json!({"summary": summary, "requested_by": requested_by}),
            format!("corr-{backlog_item_id}"),
            format!("user-{backlog_item_id}"),
        );
        self.bus.publish(&self.project_id, envelope)
    }

    /// Run one step of consuming the user outbox, answering any
    /// clarifying question it finds.
    pub fn consume_questions(&self, consumer: &str) -> Result<Option<String>, BusError> {
        let group = "g_user_gateway_out";
        let outbox = self.bus.user_outbox(&self.project_id);
        self.bus.ensure_group(&self.project_id, group, Some(&outbox))?;
        self.bus.handle_pending(&outbox, group, consumer)?;

        let proj = self.project_id.clone();
        let bus = self.bus.clone();
        bus.consume(
            &self.project_id,
            group,
            consumer,
            &|envelope| {
                let answer = build_envelope(
                    "user_response",
                    proj.clone(),
                    envelope.backlog_item_id.clone(),
                    json!({
                        "question": envelope.payload.get("question").cloned().unwrap_or_default(),
                        "answer": "Here are the acceptance criteria.",
                    }),
                    envelope.correlation_id.clone(),
                    "user-reply",
                );
                bus.publish(&proj, answer)?;
                Ok(())
            },
            Some(&outbox),
        )
    }
}
