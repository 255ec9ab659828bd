use flowbus_types::Envelope;

use crate::errors::ValidationError;
use crate::registry::SchemaRegistry;

/// Single public operation: validate an envelope structurally, then dispatch
/// to the payload validator keyed by `event_type`.
pub struct EnvelopeValidator {
    registry: SchemaRegistry,
}

impl EnvelopeValidator {
    pub fn new() -> Self {
        EnvelopeValidator {
            registry: SchemaRegistry::new(),
        }
    }

    pub fn with_registry(registry: SchemaRegistry) -> Self {
        EnvelopeValidator { registry }
    }

    /// Validate `envelope`, returning it unchanged on success.
    pub fn validate(&self, envelope: Envelope) -> Result<Envelope, ValidationError> {
        let as_value = serde_json::to_value(&envelope)
            .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
        self.registry.validate_envelope(&as_value)?;
        self.registry
            .validate_payload(&envelope.event_type, &envelope.payload)?;
        Ok(envelope)
    }

    /// Deserialize `text` as an envelope, then validate it.
    pub fn parse_and_validate(&self, text: &str) -> Result<Envelope, ValidationError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
        self.validate(envelope)
    }
}

impl Default for EnvelopeValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbus_types::build_envelope;
    use serde_json::json;

    #[test]
    fn valid_envelope_round_trips_unchanged() {
        let validator = EnvelopeValidator::new();
        let env = build_envelope(
            "initial_request",
            "demo",
            "item-1",
            json!({"summary": "Implement feature", "requested_by": "product"}),
            "corr-1",
            "cause-1",
        );
        let validated = validator.validate(env.clone()).unwrap();
        assert_eq!(validated, env);
    }

    #[test]
    fn empty_required_payload_strings_fail_validation() {
        let validator = EnvelopeValidator::new();
        let env = build_envelope(
            "initial_request",
            "demo",
            "item-1",
            json!({"summary": "", "requested_by": ""}),
            "corr-1",
            "cause-1",
        );
        assert!(validator.validate(env).is_err());
    }

    #[test]
    fn malformed_json_text_fails_before_schema_validation() {
        let validator = EnvelopeValidator::new();
        assert!(validator.parse_and_validate("{not json").is_err());
    }
}
