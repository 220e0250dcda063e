pub mod client_codegen;
pub mod config;
pub mod emit;
pub mod error;
mod freeze;
pub mod ident;
mod invariants;
pub mod model;
pub mod resolve;
pub mod structural;
pub mod typescript_codegen;

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

pub use client_codegen::generate_client;
pub use config::{resolve_client_name, ClientConfig, OutputPaths};
pub use error::AbiError;
use freeze::freeze_manifest;
use invariants::{check_invariants, check_unique_names};
pub use model::Manifest;
use model::ManifestDocument;
pub use structural::{JsonSchemaValidator, StructuralValidator, StructuralViolation, SCHEMA_VERSION};
use structural::strip_replication_fields;
pub use typescript_codegen::generate_types;

/// Validates a raw manifest value and freezes it.
///
/// Stages run in order and the first failing stage ends the run: version
/// tag, structural schema, reference and map key invariants, name
/// uniqueness.
pub fn parse_manifest(value: &JsonValue) -> Result<Manifest, AbiError> {
    parse_manifest_with(value, &JsonSchemaValidator)
}

/// [`parse_manifest`] with a caller-supplied structural validator.
pub fn parse_manifest_with(
    value: &JsonValue,
    validator: &dyn StructuralValidator,
) -> Result<Manifest, AbiError> {
    let stripped = validate_structure(value, validator)?;
    let document = decode_document(ManifestDocument::deserialize(&stripped))?;
    check_document(document)
}

/// Parses manifest JSON text.
///
/// The typed model is decoded from the text itself, so repeated keys in the
/// `types` object are reported as duplicate type names instead of being
/// silently merged.
pub fn parse_manifest_str(text: &str) -> Result<Manifest, AbiError> {
    parse_manifest_text(text, "input")
}

/// Reads and parses a manifest file.
pub fn load_manifest_from_path(path: impl AsRef<Path>) -> Result<Manifest, AbiError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| AbiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest_text(&text, &format!("file {}", path.display()))
}

fn parse_manifest_text(text: &str, origin: &str) -> Result<Manifest, AbiError> {
    let value: JsonValue = serde_json::from_str(text).map_err(|source| AbiError::Json {
        origin: origin.to_string(),
        source,
    })?;
    validate_structure(&value, &JsonSchemaValidator)?;
    let document = decode_document(serde_json::from_str::<ManifestDocument>(text))?;
    check_document(document)
}

fn validate_structure(
    value: &JsonValue,
    validator: &dyn StructuralValidator,
) -> Result<JsonValue, AbiError> {
    let mut stripped = value.clone();
    strip_replication_fields(&mut stripped);

    if let Some(found) = stripped.get("schema_version").and_then(JsonValue::as_str) {
        if found != SCHEMA_VERSION {
            return Err(AbiError::UnsupportedVersion {
                expected: SCHEMA_VERSION,
                found: found.to_string(),
            });
        }
    }

    validator
        .validate(&stripped)
        .map_err(AbiError::SchemaValidation)?;
    debug!("structural validation passed");
    Ok(stripped)
}

fn decode_document(
    decoded: Result<ManifestDocument, serde_json::Error>,
) -> Result<ManifestDocument, AbiError> {
    decoded.map_err(|err| {
        AbiError::SchemaValidation(vec![StructuralViolation::new(Vec::new(), err.to_string())])
    })
}

fn check_document(document: ManifestDocument) -> Result<Manifest, AbiError> {
    check_invariants(&document)?;
    debug!("reference and map key invariants hold");
    check_unique_names(&document)?;

    let manifest = freeze_manifest(document);
    debug!(
        methods = manifest.methods().len(),
        events = manifest.events().len(),
        types = manifest.type_count(),
        "manifest frozen"
    );
    Ok(manifest)
}

/// The two documents generated for one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub types: String,
    pub client: String,
}

impl GeneratedFiles {
    /// Writes both documents under `out_dir`, creating it if needed.
    pub fn write_to(&self, out_dir: &Path, config: &ClientConfig) -> Result<OutputPaths, AbiError> {
        fs::create_dir_all(out_dir).map_err(|source| AbiError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let paths = OutputPaths::new(out_dir, config);
        for (path, contents) in [(&paths.types, &self.types), (&paths.client, &self.client)] {
            fs::write(path, contents).map_err(|source| AbiError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(paths)
    }
}

/// Generates the types and client documents for a validated manifest.
pub fn generate(manifest: &Manifest, config: &ClientConfig) -> Result<GeneratedFiles, AbiError> {
    let types = generate_types(manifest, config)?;
    let client = generate_client(manifest, config)?;
    debug!(client = config.client_name(), "generated types and client");
    Ok(GeneratedFiles { types, client })
}
