use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_attempt() -> u32 {
    1
}

/// The outer record carried by every partition entry.
///
/// `event_type` is a plain string rather than [`crate::EventType`]: an
/// envelope whose type is not in the closed set must still deserialize so
/// that validation can reject it with `UnknownEventType`, rather than the
/// message failing to parse at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event_type: String,
    pub project_id: String,
    pub backlog_item_id: String,
    pub correlation_id: String,
    pub causation_id: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default = "default_attempt")]
    pub attempt: u32,
}

impl Envelope {
    /// Build a new envelope with `attempt` defaulted to 1 and no timestamp
    /// assigned; the bus fills in `timestamp` at publish time if absent.
    pub fn new(
        event_type: impl Into<String>,
        project_id: impl Into<String>,
        backlog_item_id: impl Into<String>,
        payload: Value,
        correlation_id: impl Into<String>,
        causation_id: impl Into<String>,
    ) -> Self {
        Envelope {
            event_type: event_type.into(),
            project_id: project_id.into(),
            backlog_item_id: backlog_item_id.into(),
            correlation_id: correlation_id.into(),
            causation_id: causation_id.into(),
            payload,
            timestamp: None,
            attempt: default_attempt(),
        }
    }

    /// Return a copy of this envelope with `attempt` incremented, as published
    /// by the retry branch of the consume loop. The timestamp is preserved
    /// from the original publish, matching the source's re-publish semantics.
    pub fn with_incremented_attempt(&self) -> Self {
        let mut next = self.clone();
        next.attempt += 1;
        next
    }
}

/// Free function mirroring the bus's envelope-construction helper; useful for
/// services that build an envelope inline without going through a builder.
pub fn build_envelope(
    event_type: impl Into<String>,
    project_id: impl Into<String>,
    backlog_item_id: impl Into<String>,
    payload: Value,
    correlation_id: impl Into<String>,
    causation_id: impl Into<String>,
) -> Envelope {
    Envelope::new(
        event_type,
        project_id,
        backlog_item_id,
        payload,
        correlation_id,
        causation_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_attempt_to_one_and_leaves_timestamp_unset() {
        let env = Envelope::new(
            "initial_request",
            "demo",
            "item-1",
            serde_json::json!({"summary": "Implement feature"}),
            "corr-1",
            "cause-1",
        );
        assert_eq!(env.attempt, 1);
        assert!(env.timestamp.is_none());
    }

    #[test]
    fn incremented_attempt_bumps_by_one_and_preserves_fields() {
        let env = Envelope::new("user_response", "demo", "item-1", Value::Null, "c", "k");
        let retried = env.with_incremented_attempt();
        assert_eq!(retried.attempt, 2);
        assert_eq!(retried.project_id, env.project_id);
        assert_eq!(retried.backlog_item_id, env.backlog_item_id);
    }
}
