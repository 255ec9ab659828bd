use thiserror::Error;

/// Envelope or payload schema violation, raised to the caller at publish
/// time or routed to the DLQ at consume time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field {0}")] MissingField(String),
    #[error("{field} must be {expected}")] WrongType { field: String, expected: &'static str },
    #[error("{field} shorter than {min_len}")] TooShort { field: String, min_len: usize },
    #[error("{field} not in enum")] NotInEnum { field: String },
    #[error("unexpected property {0}")] UnexpectedProperty(String),
    #[error("unsupported schema type {0}")] UnsupportedSchemaType(String),
    #[error("instance must be object")] InstanceNotObject,
    #[error("unknown event_type: {0}")] UnknownEventType(String),
    #[error("malformed envelope json: {0}")] MalformedJson(String),
}
