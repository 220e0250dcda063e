//! Error definitions for all `abi_codegen` pipeline stages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::structural::StructuralViolation;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
///
/// Each stage of the pipeline fails with exactly one of these values; later
/// stages never run once an earlier one has failed.
pub enum AbiError {
    /// The document does not match the structural schema. Every violation
    /// found is carried, in validator order.
    #[error("ABI schema validation failed:\n{}", render_violations(.0))]
    SchemaValidation(Vec<StructuralViolation>),
    /// The schema version tag is present but not the supported one.
    #[error("Invalid schema version: expected \"{expected}\", got \"{found}\"")]
    UnsupportedVersion {
        expected: &'static str,
        found: String,
    },
    /// Named references whose target is missing from the type table.
    #[error("{}", render_lines(.0))]
    DanglingReferences(Vec<DanglingReference>),
    /// Map type references whose key does not resolve to `string`.
    #[error("{}", render_map_keys(.0))]
    NonStringMapKeys(Vec<String>),
    /// Repeated names inside one collection (methods, events or types).
    #[error("Duplicate {kind} names: {}", .names.join(", "))]
    DuplicateNames { kind: NameKind, names: Vec<String> },
    /// The input file could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The input is not valid JSON.
    #[error("Invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    /// The generator met a shape the validated model should have excluded.
    #[error("internal generation error: {0}")]
    Internal(String),
}

/// Collection a duplicate name was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Method,
    Event,
    Type,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NameKind::Method => "method",
            NameKind::Event => "event",
            NameKind::Type => "type",
        };
        f.write_str(text)
    }
}

/// A `$ref` that names a type absent from the manifest's type table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// The referenced (missing) type name.
    pub name: String,
    /// Human-readable location, e.g. `method.get.param.id`.
    pub location: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dangling $ref \"{}\" in {}", self.name, self.location)
    }
}

fn render_violations(violations: &[StructuralViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("- {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_map_keys(locations: &[String]) -> String {
    locations
        .iter()
        .map(|location| format!("Map key must be string type in {location}"))
        .collect::<Vec<_>>()
        .join("\n")
}
