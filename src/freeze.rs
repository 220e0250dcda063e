//! Conversion of a checked document into the shared, read-only [`Manifest`].

use indexmap::IndexMap;

use crate::model::{Manifest, ManifestDocument};

/// Moves a document that passed every check into an immutable manifest.
///
/// Type names are unique at this point, so the table keeps declaration order
/// without losing entries.
pub(crate) fn freeze_manifest(document: ManifestDocument) -> Manifest {
    let ManifestDocument {
        schema_version,
        types,
        methods,
        events,
    } = document;

    let types: IndexMap<_, _> = types.entries.into_iter().collect();
    Manifest::from_parts(schema_version, types, methods, events)
}
