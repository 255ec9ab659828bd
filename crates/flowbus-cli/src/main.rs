use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use flowbus_adapters::InMemoryLogStore;
use flowbus_config::{init_tracing, BusConfig};
use flowbus_core::{EventBus, LogStoreAdapter};
use flowbus_redis::RedisLogStore;
use flowbus_services::{Clarification, DevWorker, Orchestrator, QaWorker, Reporting, UserGateway};
use flowbus_types::ProjectState;
use tracing::info;

#[derive(Parser)]
#[command(name = "flowbus-cli", about = "Demo driver for the workflow event bus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run intake through reporting and print the resulting snapshot.
    HappyPath,
    /// Force every dev-worker invocation to fail and watch retry -> DLQ.
    FailureRetryDlq,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BusConfig::from_env()?;
    init_tracing(&config.log_filter);

    if config.real_redis {
        let store = RedisLogStore::connect(&config.redis_url())?;
        dispatch(cli.command, EventBus::new(store))
    } else {
        let store = InMemoryLogStore::new();
        dispatch(cli.command, EventBus::new(store))
    }
}

fn dispatch<S: LogStoreAdapter + 'static>(command: Command, bus: EventBus<S>) -> anyhow::Result<()> {
    match command {
        Command::HappyPath => run_happy_path(bus),
        Command::FailureRetryDlq => run_failure_retry_dlq(bus),
    }
}

fn run_happy_path<S: LogStoreAdapter + 'static>(bus: EventBus<S>) -> anyhow::Result<()> {
    let project_id = "demo";
    let backlog_item_id = "item-1";

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

fn run_failure_retry_dlq<S: LogStoreAdapter + 'static>(bus: EventBus<S>) -> anyhow::Result<()> {
    let project_id = "demo-fail";
    let backlog_item_id = "item-fail";

    let orchestrator = Orchestrator::new(project_id, bus.clone());
    let failing_dev = DevWorker::new(project_id, bus.clone(), true);
    let user_gateway = UserGateway::new(project_id, bus.clone());

    user_gateway.submit_initial(backlog_item_id, "Failing item", "qa")?;
    orchestrator.consume("g_orchestrator", "orch")?;

    let ready = flowbus_types::build_envelope(
        "ready_for_dev",
        project_id,
        backlog_item_id,
        serde_json::json!({"backlog_item_id": backlog_item_id}),
        "corr-fail",
        "orch",
    );
    bus.publish(project_id, ready)?;

    // Dev worker always fails; after MAX_ATTEMPTS deliveries the item lands in the DLQ.
    for _ in 0..6 {
        failing_dev.consume("g_dev", "dev")?;
    }

    let dlq = bus.read_dead_letters(project_id, 10)?;
    info!(dlq_size = dlq.len(), "final DLQ contents");
    Ok(())
}
