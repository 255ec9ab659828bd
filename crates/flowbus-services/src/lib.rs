//! Demo workflow services: thin producers/consumers whose only contract is
//! the event bus API. Intake → clarification → development → QA →
//! reporting, wired through [`flowbus_core::EventBus`].

mod clarification;
mod dev_worker;
mod orchestrator;
mod qa_worker;
mod reporting;
mod user_gateway;

pub use clarification::Clarification;
pub use dev_worker::DevWorker;
pub use orchestrator::Orchestrator;
pub use qa_worker::QaWorker;
pub use reporting::Reporting;
pub use user_gateway::UserGateway;
