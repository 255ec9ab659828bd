use std::sync::{Arc, Mutex};

use flowbus_adapters::InMemoryLogStore;
use flowbus_core::EventBus;
use flowbus_services::{Clarification, DevWorker, Orchestrator, QaWorker, Reporting, UserGateway};
use flowbus_types::ProjectState;

/// End-to-end happy path: intake through clarification, dev, QA, and a
/// final reporting snapshot with status `done`.
#[test]
fn happy_path_produces_done_snapshot() {
    let store = InMemoryLogStore::new();
    let bus = EventBus::new(store);
    let project = "demo";

    let orchestrator = Orchestrator::new(project, bus.clone());
    let clarification = Clarification::new(project, bus.clone());
    let user_gateway = UserGateway::new(project, bus.clone());
    let dev_worker = DevWorker::new(project, bus.clone(), false);
    let qa_worker = QaWorker::new(project, bus.clone());
    let state = Arc::new(Mutex::new(ProjectState::new()));
    let reporting = Reporting::new(project, bus.clone(), state.clone());

    user_gateway
        .submit_initial("item-1", "Implement feature", "product")
        .unwrap();

    for _ in 0..50 {
        let mut progressed = false;
        progressed |= orchestrator.consume("g_orchestrator", "c1").unwrap().is_some();
        progressed |= clarification.consume("g_clarification", "c1").unwrap().is_some();
        progressed |= user_gateway.consume_questions("c1").unwrap().is_some();
        progressed |= dev_worker.consume("g_dev_worker", "c1").unwrap().is_some();
        progressed |= qa_worker.consume("g_qa_worker", "c1").unwrap().is_some();
        progressed |= reporting.consume("g_reporting", "c1").unwrap().is_some();
        if !progressed {
            break;
        }
    }

    let state = state.lock().unwrap();
    let item = state.get("item-1").expect("backlog item should exist");
    assert_eq!(item.status, "done");
    assert_eq!(item.history, vec!["done".to_string()]);
}
