use std::collections::HashMap;

use serde_json::Value;

use crate::errors::ValidationError;
use crate::json_schema::SchemaValidator;
use crate::schemas::{load_envelope_schema, load_payload_schemas};

/// Loads the envelope schema and the per-event-type payload schemas once,
/// and exposes the two validation entry points the bus depends on.
pub struct SchemaRegistry {
    envelope_validator: SchemaValidator,
    payload_validators: HashMap<String, SchemaValidator>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let envelope_validator = SchemaValidator::new(load_envelope_schema().clone());
        let payload_validators = load_payload_schemas()
            .as_object()
            .expect("payload schemas must be an object keyed by event_type")
            .iter()
            .map(|(event_type, schema)| {
                (event_type.clone(), SchemaValidator::new(schema.clone()))
            })
            .collect();
        SchemaRegistry {
            envelope_validator,
            payload_validators,
        }
    }

    pub fn validate_envelope(&self, envelope: &Value) -> Result<(), ValidationError> {
        self.envelope_validator.validate(envelope)
    }

    pub fn validate_payload(&self, event_type: &str, payload: &Value) -> Result<(), ValidationError> {
        let validator = self
            .payload_validators
            .get(event_type)
            .ok_or_else(|| ValidationError::UnknownEventType(event_type.to_string()))?;
        validator.validate(payload)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_known_event_type_payload() {
        let registry = SchemaRegistry::new();
        let payload = json!({"summary": "do it", "requested_by": "product"});
        assert!(registry.validate_payload("initial_request", &payload).is_ok());
    }

    #[test]
    fn rejects_unknown_event_type() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate_payload("not_a_real_type", &json!({}))
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownEventType("not_a_real_type".to_string()));
    }

    #[test]
    fn validates_envelope_shape() {
        let registry = SchemaRegistry::new();
        let envelope = json!({
            "event_type": "initial_request",
            "project_id": "demo",
            "backlog_item_id": "item-1",
            "correlation_id": "c",
            "causation_id": "k",
            "payload": {}
        });
        assert!(registry.validate_envelope(&envelope).is_ok());
    }
}
