//! Semantic checks the structural schema cannot express.
//!
//! Each check walks every type reference reachable from the manifest and
//! collects all violations of its category before failing.

use std::collections::HashSet;

use crate::error::{AbiError, DanglingReference, NameKind};
use crate::model::{ManifestDocument, ScalarKind, TypeDef, TypeRef, TypeTable};

/// Runs reference resolution, then the map key constraint.
pub(crate) fn check_invariants(document: &ManifestDocument) -> Result<(), AbiError> {
    check_references(document)?;
    check_map_keys(document)
}

/// Rejects repeated method, event or type names, in that order.
pub(crate) fn check_unique_names(document: &ManifestDocument) -> Result<(), AbiError> {
    ensure_unique(
        NameKind::Method,
        document.methods.iter().map(|method| method.name()),
    )?;
    ensure_unique(
        NameKind::Event,
        document.events.iter().map(|event| event.name()),
    )?;
    ensure_unique(
        NameKind::Type,
        document.types.entries.iter().map(|(name, _)| name.as_str()),
    )
}

fn check_references(document: &ManifestDocument) -> Result<(), AbiError> {
    let mut dangling = Vec::new();
    for_each_type_ref(document, &mut |ty: &TypeRef, location: &str| {
        if let TypeRef::Reference(name) = ty {
            if !document.types.contains(name) {
                dangling.push(DanglingReference {
                    name: name.clone(),
                    location: location.to_string(),
                });
            }
        }
    });

    if dangling.is_empty() {
        Ok(())
    } else {
        Err(AbiError::DanglingReferences(dangling))
    }
}

fn check_map_keys(document: &ManifestDocument) -> Result<(), AbiError> {
    let mut offending = Vec::new();
    for_each_type_ref(document, &mut |ty: &TypeRef, location: &str| {
        if let TypeRef::Map { key, .. } = ty {
            if !is_string_key(key, &document.types) {
                offending.push(location.to_string());
            }
        }
    });

    if offending.is_empty() {
        Ok(())
    } else {
        Err(AbiError::NonStringMapKeys(offending))
    }
}

/// A key is the string scalar, or a chain of aliases ending in it.
fn is_string_key(key: &TypeRef, types: &TypeTable) -> bool {
    let mut visited = HashSet::new();
    let mut current = key;
    loop {
        match current {
            TypeRef::Scalar(ScalarKind::String) => return true,
            TypeRef::Reference(name) => {
                if !visited.insert(name.as_str()) {
                    return false;
                }
                match types.get(name) {
                    Some(TypeDef::Alias(target)) => current = target,
                    _ => return false,
                }
            }
            _ => return false,
        }
    }
}

fn ensure_unique<'a>(
    kind: NameKind,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), AbiError> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for name in names {
        if !seen.insert(name) && !duplicates.iter().any(|dup| dup == name) {
            duplicates.push(name.to_string());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(AbiError::DuplicateNames {
            kind,
            names: duplicates,
        })
    }
}

/// Visits every type reference in the document with its location label.
///
/// Roots are method params, returns and error payloads, event payloads, then
/// type table entries (record fields, variant payloads, alias targets).
fn for_each_type_ref<'a>(
    document: &'a ManifestDocument,
    visit: &mut dyn FnMut(&'a TypeRef, &str),
) {
    for method in &document.methods {
        for param in method.params() {
            walk(
                param.ty(),
                format!("method.{}.param.{}", method.name(), param.name()),
                visit,
            );
        }
        if let Some(returns) = method.returns() {
            walk(returns, format!("method.{}.returns", method.name()), visit);
        }
        for error in method.errors() {
            if let Some(payload) = error.payload() {
                walk(
                    payload,
                    format!("method.{}.error.{}", method.name(), error.code()),
                    visit,
                );
            }
        }
    }

    for event in &document.events {
        if let Some(payload) = event.payload() {
            walk(payload, format!("event.{}", event.name()), visit);
        }
    }

    for (name, def) in &document.types.entries {
        match def {
            TypeDef::Record(fields) => {
                for field in fields {
                    walk(
                        field.ty(),
                        format!("type.{name}.field.{}", field.name()),
                        visit,
                    );
                }
            }
            TypeDef::Variant(cases) => {
                for case in cases {
                    if let Some(payload) = case.payload() {
                        walk(payload, format!("type.{name}.variant.{}", case.name()), visit);
                    }
                }
            }
            TypeDef::Alias(target) => walk(target, format!("type.{name}.target"), visit),
            TypeDef::Bytes(_) => {}
        }
    }
}

fn walk<'a>(ty: &'a TypeRef, location: String, visit: &mut dyn FnMut(&'a TypeRef, &str)) {
    visit(ty, &location);
    match ty {
        TypeRef::List(items) => walk(items, format!("{location}.items"), visit),
        TypeRef::Map { key, value } => {
            walk(key, format!("{location}.key"), visit);
            walk(value, format!("{location}.value"), visit);
        }
        TypeRef::Record(fields) => {
            for field in fields {
                walk(
                    field.ty(),
                    format!("{location}.field.{}", field.name()),
                    visit,
                );
            }
        }
        TypeRef::Reference(_) | TypeRef::Scalar(_) | TypeRef::Bytes(_) => {}
    }
}
