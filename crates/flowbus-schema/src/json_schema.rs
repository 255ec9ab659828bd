//! A deliberately small subset of JSON-Schema Draft 2020-12: `required`,
//! `properties`, `additionalProperties` (boolean only), and for `string`
//! properties `minLength`/`enum`, with `object` recursing into a nested
//! validator. Any other `type` value is rejected rather than silently
//! accepted; this validator never honors a keyword it doesn't implement.

use serde_json::Value;

use crate::errors::ValidationError;

#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
}

impl SchemaValidator {
    pub fn new(schema: Value) -> Self {
        SchemaValidator { schema }
    }

    pub fn validate(&self, instance: &Value) -> Result<(), ValidationError> {
        Self::validate_against(&self.schema, instance)
    }

    fn validate_against(schema: &Value, instance: &Value) -> Result<(), ValidationError> {
        let instance = instance
            .as_object()
            .ok_or(ValidationError::InstanceNotObject)?;

        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for field in &required {
            let field = field.as_str().unwrap_or_default();
            if !instance.contains_key(field) {
                return Err(ValidationError::MissingField(field.to_string()));
            }
        }

        let empty_props = serde_json::Map::new();
        let props = schema
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty_props);
        let additional_allowed = schema
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        for (key, value) in instance {
            match props.get(key) {
                Some(prop_schema) => Self::validate_property(key, value, prop_schema)?,
                None if !additional_allowed => {
                    return Err(ValidationError::UnexpectedProperty(key.clone()))
                }
                None => {}
            }
        }
        Ok(())
    }

    fn validate_property(key: &str, value: &Value, schema: &Value) -> Result<(), ValidationError> {
        let expected_type = schema.get("type").and_then(Value::as_str);
        match expected_type {
            Some("string") => {
                let s = value.as_str().ok_or_else(|| ValidationError::WrongType {
                    field: key.to_string(),
                    expected: "string",
                })?;
                if let Some(min_len) = schema.get("minLength").and_then(Value::as_u64) {
                    if (s.chars().count() as u64) < min_len {
                        return Err(ValidationError::TooShort {
                            field: key.to_string(),
                            min_len: min_len as usize,
                        });
                    }
                }
                if let Some(enum_values) = schema.get("enum").and_then(Value::as_array) {
                    let matches = enum_values.iter().any(|v| v.as_str() == Some(s));
                    if !matches {
                        return Err(ValidationError::NotInEnum {
                            field: key.to_string(),
                        });
                    }
                }
                Ok(())
            }
            Some("object") => Self::validate_against(schema, value),
            Some(other) => Err(ValidationError::UnsupportedSchemaType(other.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["summary", "requested_by"],
            "properties": {
                "summary": {"type": "string", "minLength": 1},
                "requested_by": {"type": "string", "minLength": 1},
                "priority": {"type": "string", "enum": ["low", "high"]}
            },
            "additionalProperties": true
        })
    }

    #[test]
    fn accepts_valid_instance() {
        let v = SchemaValidator::new(schema());
        let instance = json!({"summary": "do it", "requested_by": "product"});
        assert!(v.validate(&instance).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let v = SchemaValidator::new(schema());
        let instance = json!({"summary": "do it"});
        assert_eq!(
            v.validate(&instance).unwrap_err(),
            ValidationError::MissingField("requested_by".to_string())
        );
    }

    #[test]
    fn rejects_string_shorter_than_min_length() {
        let v = SchemaValidator::new(schema());
        let instance = json!({"summary": "", "requested_by": ""});
        assert!(matches!(
            v.validate(&instance).unwrap_err(),
            ValidationError::TooShort { .. }
        ));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let v = SchemaValidator::new(schema());
        let instance = json!({"summary": "x", "requested_by": "y", "priority": "medium"});
        assert!(matches!(
            v.validate(&instance).unwrap_err(),
            ValidationError::NotInEnum { .. }
        ));
    }

    #[test]
    fn rejects_unexpected_property_when_additional_disallowed() {
        let strict = json!({
            "type": "object",
            "required": [],
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        });
        let v = SchemaValidator::new(strict);
        let instance = json!({"a": "ok", "b": "nope"});
        assert!(matches!(
            v.validate(&instance).unwrap_err(),
            ValidationError::UnexpectedProperty(_)
        ));
    }

    #[test]
    fn recurses_into_nested_object_schema() {
        let nested = json!({
            "type": "object",
            "required": ["state"],
            "properties": {
                "state": {
                    "type": "object",
                    "required": ["status"],
                    "properties": {"status": {"type": "string", "minLength": 1}}
                }
            }
        });
        let v = SchemaValidator::new(nested);
        assert!(v.validate(&json!({"state": {"status": "done"}})).is_ok());
        assert!(v.validate(&json!({"state": {"status": ""}})).is_err());
    }
}
