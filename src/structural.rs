//! Structural validation of raw manifest documents.
//!
//! The document shape lives in an embedded JSON Schema (draft 2020-12) and is
//! checked with the `jsonschema` crate. Callers only see the
//! [`StructuralValidator`] contract: either acceptance or every violation as a
//! `(path, message)` pair.

use std::fmt;
use std::sync::OnceLock;

use jsonschema::{Draft, Validator};
use serde_json::Value as JsonValue;

/// The single manifest version this crate accepts.
pub const SCHEMA_VERSION: &str = "wasm-abi/1";

/// Replication/runtime-only keys removed before validation.
pub const REPLICATION_FIELDS: [&str; 3] = ["crdt_type", "inner_type", "state_root"];

const WASM_ABI_V1_SCHEMA: &str = include_str!("schema/wasm-abi-v1.schema.json");

/// One structural problem found in a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralViolation {
    /// Segments from the document root to the offending value.
    pub path: Vec<String>,
    pub message: String,
}

impl StructuralViolation {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Builds a violation from a JSON pointer such as `/types/A~1B/kind`.
    pub fn from_pointer(pointer: &str, message: impl Into<String>) -> Self {
        let path = pointer
            .split('/')
            .skip(1)
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect();
        Self::new(path, message)
    }

    /// Dot-joined path, `<root>` for the document itself.
    pub fn location(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }
}

impl fmt::Display for StructuralViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Pass/fail structural check over a raw JSON document.
pub trait StructuralValidator {
    /// Returns every violation found, in validator order. An `Err` always
    /// carries at least one violation.
    fn validate(&self, document: &JsonValue) -> Result<(), Vec<StructuralViolation>>;
}

/// Validator backed by the embedded WASM-ABI v1 JSON Schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl StructuralValidator for JsonSchemaValidator {
    fn validate(&self, document: &JsonValue) -> Result<(), Vec<StructuralViolation>> {
        let validator = match compiled_schema() {
            Ok(validator) => validator,
            Err(message) => {
                return Err(vec![StructuralViolation::new(
                    Vec::new(),
                    format!("structural schema unavailable: {message}"),
                )])
            }
        };

        let violations: Vec<StructuralViolation> = validator
            .iter_errors(document)
            .map(|error| {
                StructuralViolation::from_pointer(
                    &error.instance_path().to_string(),
                    error.to_string(),
                )
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn compiled_schema() -> Result<&'static Validator, &'static str> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: JsonValue = serde_json::from_str(WASM_ABI_V1_SCHEMA)
                .map_err(|err| format!("invalid embedded schema: {err}"))?;
            jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&schema)
                .map_err(|err| format!("failed to compile embedded schema: {err}"))
        })
        .as_ref()
        .map_err(String::as_str)
}

/// Removes [`REPLICATION_FIELDS`] from every object at any depth.
pub fn strip_replication_fields(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.retain(|key, _| !REPLICATION_FIELDS.contains(&key.as_str()));
            for child in map.values_mut() {
                strip_replication_fields(child);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                strip_replication_fields(item);
            }
        }
        _ => {}
    }
}
