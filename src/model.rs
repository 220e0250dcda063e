//! Manifest type model: types, methods, events and type references.
//!
//! Values in this module are read-only once constructed. [`Manifest`] can
//! only be obtained from the validation pipeline and exposes nothing but
//! shared borrows of its contents, so a validated manifest cannot change
//! after the fact:
//!
//! ```compile_fail
//! let manifest = abi_codegen::parse_manifest_str(
//!     r#"{"schema_version":"wasm-abi/1","types":{},"methods":[],"events":[]}"#,
//! ).unwrap();
//! manifest.methods().push(todo!());
//! ```
//!
//! ```compile_fail
//! let manifest = abi_codegen::parse_manifest_str(
//!     r#"{"schema_version":"wasm-abi/1","types":{},"methods":[],"events":[]}"#,
//! ).unwrap();
//! manifest.methods = Vec::new();
//! ```

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Scalar kinds a type reference may name inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Unit,
}

impl ScalarKind {
    /// Parses the manifest `kind` tag of a scalar.
    pub fn from_kind(kind: &str) -> Option<Self> {
        let scalar = match kind {
            "bool" => ScalarKind::Bool,
            "i32" => ScalarKind::I32,
            "i64" => ScalarKind::I64,
            "u32" => ScalarKind::U32,
            "u64" => ScalarKind::U64,
            "f32" => ScalarKind::F32,
            "f64" => ScalarKind::F64,
            "string" => ScalarKind::String,
            "unit" => ScalarKind::Unit,
            _ => return None,
        };
        Some(scalar)
    }

    /// The manifest `kind` tag for this scalar.
    pub fn as_kind(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
            ScalarKind::Unit => "unit",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_kind())
    }
}

/// Length discipline of a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteLength {
    Variable,
    Fixed(NonZeroU32),
}

/// A reference to a type, either inline or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTypeRef")]
pub enum TypeRef {
    /// `{"$ref": "Name"}`: resolved through the manifest type table.
    Reference(String),
    Scalar(ScalarKind),
    Bytes(ByteLength),
    List(Box<TypeRef>),
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
    /// Inline record with ordered fields.
    Record(Vec<Field>),
}

impl TypeRef {
    /// Name of the referenced type when this is a `$ref`.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            TypeRef::Reference(name) => Some(name),
            _ => None,
        }
    }
}

/// Named, top-level type definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTypeDef")]
pub enum TypeDef {
    Record(Vec<Field>),
    /// Tagged union; cases keep declaration order.
    Variant(Vec<VariantCase>),
    Bytes(ByteLength),
    Alias(TypeRef),
}

impl TypeDef {
    /// The manifest `kind` tag of this definition.
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDef::Record(_) => "record",
            TypeDef::Variant(_) => "variant",
            TypeDef::Bytes(_) => "bytes",
            TypeDef::Alias(_) => "alias",
        }
    }
}

/// Record field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    #[serde(default)]
    nullable: bool,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// One case of a variant type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantCase {
    name: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    payload: Option<TypeRef>,
}

impl VariantCase {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional stable code attached to the case by the producer.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn payload(&self) -> Option<&TypeRef> {
        self.payload.as_ref()
    }
}

/// Method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Parameter {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    #[serde(default)]
    nullable: bool,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Declared failure of a method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodError {
    code: String,
    #[serde(default)]
    payload: Option<TypeRef>,
}

impl MethodError {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn payload(&self) -> Option<&TypeRef> {
        self.payload.as_ref()
    }
}

/// Callable method of the remote component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Method {
    name: String,
    params: Vec<Parameter>,
    #[serde(default)]
    returns: Option<TypeRef>,
    #[serde(default)]
    returns_nullable: bool,
    #[serde(default)]
    errors: Vec<MethodError>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn returns(&self) -> Option<&TypeRef> {
        self.returns.as_ref()
    }

    pub fn returns_nullable(&self) -> bool {
        self.returns_nullable
    }

    pub fn errors(&self) -> &[MethodError] {
        &self.errors
    }
}

/// Event emitted by the remote component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default)]
    payload: Option<TypeRef>,
}

impl Event {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Option<&TypeRef> {
        self.payload.as_ref()
    }
}

/// Validated, immutable manifest.
///
/// Cloning is cheap and clones share the same underlying data, so one
/// manifest can feed any number of concurrent generation passes.
#[derive(Debug, Clone)]
pub struct Manifest {
    inner: Arc<ManifestData>,
}

#[derive(Debug)]
struct ManifestData {
    schema_version: String,
    types: IndexMap<String, TypeDef>,
    methods: Vec<Method>,
    events: Vec<Event>,
}

impl Manifest {
    pub(crate) fn from_parts(
        schema_version: String,
        types: IndexMap<String, TypeDef>,
        methods: Vec<Method>,
        events: Vec<Event>,
    ) -> Self {
        Self {
            inner: Arc::new(ManifestData {
                schema_version,
                types,
                methods,
                events,
            }),
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.inner.schema_version
    }

    /// Type table entries in declaration order.
    pub fn types(&self) -> impl ExactSizeIterator<Item = (&str, &TypeDef)> + '_ {
        self.inner
            .types
            .iter()
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Looks up a named type.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.inner.types.get(name)
    }

    pub fn type_count(&self) -> usize {
        self.inner.types.len()
    }

    pub fn methods(&self) -> &[Method] {
        &self.inner.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.inner.methods.iter().find(|method| method.name == name)
    }

    pub fn events(&self) -> &[Event] {
        &self.inner.events
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.inner.events.iter().find(|event| event.name == name)
    }
}

/// Deserialized document before invariant checks and freezing.
#[derive(Debug, Deserialize)]
pub(crate) struct ManifestDocument {
    pub schema_version: String,
    pub types: TypeTable,
    pub methods: Vec<Method>,
    pub events: Vec<Event>,
}

/// Type table entries in source order, duplicates included.
#[derive(Debug, Default)]
pub(crate) struct TypeTable {
    pub entries: Vec<(String, TypeDef)>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, def)| def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl<'de> Deserialize<'de> for TypeTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TypeTableVisitor;

        impl<'de> Visitor<'de> for TypeTableVisitor {
            type Value = TypeTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of type name to type definition")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, def)) = map.next_entry::<String, TypeDef>()? {
                    entries.push((name, def));
                }
                Ok(TypeTable { entries })
            }
        }

        deserializer.deserialize_map(TypeTableVisitor)
    }
}

#[derive(Deserialize)]
struct RawTypeRef {
    #[serde(rename = "$ref", default)]
    reference: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    items: Option<Box<TypeRef>>,
    #[serde(default)]
    key: Option<Box<TypeRef>>,
    #[serde(default)]
    value: Option<Box<TypeRef>>,
    #[serde(default)]
    fields: Option<Vec<Field>>,
}

impl TryFrom<RawTypeRef> for TypeRef {
    type Error = String;

    fn try_from(raw: RawTypeRef) -> Result<Self, Self::Error> {
        if let Some(name) = raw.reference {
            return Ok(TypeRef::Reference(name));
        }

        let kind = raw
            .kind
            .ok_or_else(|| "type reference needs either '$ref' or 'kind'".to_string())?;

        if let Some(scalar) = ScalarKind::from_kind(&kind) {
            return Ok(TypeRef::Scalar(scalar));
        }

        match kind.as_str() {
            "bytes" => byte_length(raw.size).map(TypeRef::Bytes),
            "list" => raw
                .items
                .map(TypeRef::List)
                .ok_or_else(|| "list type reference is missing 'items'".to_string()),
            "map" => match (raw.key, raw.value) {
                (Some(key), Some(value)) => Ok(TypeRef::Map { key, value }),
                _ => Err("map type reference needs 'key' and 'value'".to_string()),
            },
            "record" => raw
                .fields
                .map(TypeRef::Record)
                .ok_or_else(|| "record type reference is missing 'fields'".to_string()),
            other => Err(format!("unknown type reference kind '{other}'")),
        }
    }
}

#[derive(Deserialize)]
struct RawTypeDef {
    kind: String,
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    fields: Option<Vec<Field>>,
    #[serde(default)]
    variants: Option<Vec<VariantCase>>,
    #[serde(default)]
    target: Option<TypeRef>,
}

impl TryFrom<RawTypeDef> for TypeDef {
    type Error = String;

    fn try_from(raw: RawTypeDef) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "record" => raw
                .fields
                .map(TypeDef::Record)
                .ok_or_else(|| "record type is missing 'fields'".to_string()),
            "variant" => raw
                .variants
                .map(TypeDef::Variant)
                .ok_or_else(|| "variant type is missing 'variants'".to_string()),
            "bytes" => byte_length(raw.size).map(TypeDef::Bytes),
            "alias" => raw
                .target
                .map(TypeDef::Alias)
                .ok_or_else(|| "alias type is missing 'target'".to_string()),
            other => Err(format!("unknown type definition kind '{other}'")),
        }
    }
}

fn byte_length(size: Option<u32>) -> Result<ByteLength, String> {
    match size {
        None => Ok(ByteLength::Variable),
        Some(size) => NonZeroU32::new(size)
            .map(ByteLength::Fixed)
            .ok_or_else(|| "fixed bytes size must be at least 1".to_string()),
    }
}
