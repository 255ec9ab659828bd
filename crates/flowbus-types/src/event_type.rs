use std::fmt;
use std::str::FromStr;

/// The closed set of workflow event types the payload schemas must cover.
///
/// Envelopes carry `event_type` as a plain string (see [`crate::Envelope`])
/// because an unrecognized value is a validation failure, not a
/// construction-time impossibility; this enum exists for dispatch tables
/// and schema lookups, not to gate what can be deserialized off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    InitialRequest,
    BacklogItemCreated,
    ClarificationNeeded,
    UserResponse,
    ReadyForDev,
    DevDeliverable,
    QaReport,
    WorkCompleted,
    Snapshot,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::InitialRequest,
        EventType::BacklogItemCreated,
        EventType::ClarificationNeeded,
        EventType::UserResponse,
        EventType::ReadyForDev,
        EventType::DevDeliverable,
        EventType::QaReport,
        EventType::WorkCompleted,
        EventType::Snapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InitialRequest => "initial_request",
            EventType::BacklogItemCreated => "backlog_item_created",
            EventType::ClarificationNeeded => "clarification_needed",
            EventType::UserResponse => "user_response",
            EventType::ReadyForDev => "ready_for_dev",
            EventType::DevDeliverable => "dev_deliverable",
            EventType::QaReport => "qa_report",
            EventType::WorkCompleted => "work_completed",
            EventType::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not match any recognized event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedEventType(pub String);

impl fmt::Display for UnrecognizedEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized event type: {}", self.0)
    }
}

impl std::error::Error for UnrecognizedEventType {}

impl FromStr for EventType {
    type Err = UnrecognizedEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| UnrecognizedEventType(s.to_string()))
    }
}
