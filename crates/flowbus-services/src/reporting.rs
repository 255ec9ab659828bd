use std::sync::{Arc, Mutex};

use flowbus_core::{BusError, EventBus, LogStoreAdapter, ServiceBase};
use flowbus_types::ProjectState;
use serde_json::json;

/// Transitions the backlog item to `done` and emits a snapshot of the
/// project's workflow state.
pub struct Reporting<S: LogStoreAdapter> {
    base: ServiceBase<S>,
    state: Arc<Mutex<ProjectState>>,
}

impl<S: LogStoreAdapter + 'static> Reporting<S> {
    pub fn new(project_id: impl Into<String>, bus: EventBus<S>, state: Arc<Mutex<ProjectState>>) -> Self {
        let project_id = project_id.into();
        let mut base = ServiceBase::new("reporting", project_id.clone(), bus.clone());

        let proj = project_id.clone();
        let state_for_handler = state.clone();
        base.on("work_completed", move |envelope| {
            let mut state = state_for_handler.lock().unwrap();
            let backlog_item = state.get_or_create(&envelope.backlog_item_id);
            backlog_item.transition("done");
            let snapshot_state = json!({
                "project_id": proj,
                "backlog_item_id": backlog_item.backlog_item_id,
                "status": backlog_item.status,
                "history": backlog_item.history,
                "causation_id": envelope.causation_id,
                "correlation_id": envelope.correlation_id,
            });
            drop(state);
            bus.emit_snapshot(&proj, snapshot_state)?;
            Ok(())
        });

        Reporting { base, state }
    }

    pub fn state(&self) -> &Arc<Mutex<ProjectState>> {
        &self.state
    }

    pub fn consume(&self, group: &str, consumer: &str) -> Result<Option<String>, BusError> {
        self.base.consume(group, consumer, None)
    }
}
