//! Schema loading and validation: the registry caches the envelope schema
//! and per-event-type payload schemas once per process; the validator
//! dispatches an envelope through both.

mod errors;
mod json_schema;
mod registry;
mod schemas;
mod validator;

pub use errors::ValidationError;
pub use json_schema::SchemaValidator;
pub use registry::SchemaRegistry;
pub use validator::EnvelopeValidator;
