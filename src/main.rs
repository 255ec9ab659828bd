//! Minimal smoke entry point: runs intake through reporting against the
//! in-memory adapter and logs the resulting backlog item state. The full
//! demo driver, with a real Redis option, lives in `flowbus-cli`.

use std::sync::{Arc, Mutex};

use flowbus_adapters::InMemoryLogStore;
use flowbus_config::{init_tracing, BusConfig};
use flowbus_core::EventBus;
use flowbus_services::{Clarification, DevWorker, Orchestrator, QaWorker, Reporting, UserGateway};
use flowbus_types::ProjectState;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = BusConfig::from_env()?;
    init_tracing(&config.log_filter);

    let project_id = "demo";
    let backlog_item_id = "item-1";

    let bus = EventBus::new(InMemoryLogStore::new());
    let orchestrator = Orchestrator::new(project_id, bus.clone());
    let clarification = Clarification::new(project_id, bus.clone());
    let user_gateway = UserGateway::new(project_id, bus.clone());
    let dev_worker = DevWorker::new(project_id, bus.clone(), false);
    let qa_worker = QaWorker::new(project_id, bus.clone());
    let state = Arc::new(Mutex::new(ProjectState::new()));
    let reporting = Reporting::new(project_id, bus, state.clone());

    user_gateway.submit_initial(backlog_item_id, "Implement feature", "product")?;

    for _ in 0..50 {
        let mut progressed = false;
        progressed |= orchestrator.consume("g_orchestrator", "orch")?.is_some();
        progressed |= clarification.consume("g_clarification", "clar")?.is_some();
        progressed |= user_gateway.consume_questions("gateway-out")?.is_some();
        progressed |= dev_worker.consume("g_dev", "dev")?.is_some();
        progressed |= qa_worker.consume("g_qa", "qa")?.is_some();
        progressed |= reporting.consume("g_reporting", "report")?.is_some();
        if !progressed {
            break;
        }
    }

    let state = state.lock().unwrap();
    match state.get(backlog_item_id) {
        Some(item) => info!(status = %item.status, history = ?item.history, "final backlog item state"),
        None => info!("backlog item never reached reporting"),
    }
    Ok(())
}
