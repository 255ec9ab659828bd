use once_cell::sync::Lazy;
use serde_json::Value;

const ENVELOPE_SCHEMA_SRC: &str = include_str!("../schemas/event_envelope.json");
const PAYLOAD_SCHEMAS_SRC: &str = include_str!("../schemas/payload_schemas.json");

/// Parsed once per process, mirroring an `lru_cache(maxsize=1)` loader.
static ENVELOPE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(ENVELOPE_SCHEMA_SRC).expect("event_envelope.json must be valid JSON")
});

static PAYLOAD_SCHEMAS: Lazy<Value> = Lazy::new(|| {
    let doc: Value =
        serde_json::from_str(PAYLOAD_SCHEMAS_SRC).expect("payload_schemas.json must be valid JSON");
    doc.get("properties")
        .cloned()
        .expect("payload_schemas.json must have a top-level `properties` object")
});

pub fn load_envelope_schema() -> &'static Value {
    &ENVELOPE_SCHEMA
}

pub fn load_payload_schemas() -> &'static Value {
    &PAYLOAD_SCHEMAS
}
