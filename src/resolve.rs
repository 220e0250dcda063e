//! Mapping of manifest type references to TypeScript type expressions.

use std::collections::{HashMap, HashSet};

use crate::error::AbiError;
use crate::ident::{format_identifier, format_property_name, unique_identifier};
use crate::model::{Field, Manifest, ScalarKind, TypeDef, TypeRef};

/// Runtime class every byte sequence maps to.
pub const BINARY_TYPE: &str = "AbiBytes";

/// Name of the aggregate union over all events.
pub const EVENT_UNION: &str = "AbiEvent";

/// Resolves type references against one manifest's type table.
///
/// Declared names are computed once: every type gets a sanitized, unique
/// identifier and every variant additionally gets a `<Name>Payload` type
/// name, since `<Name>` itself is taken by the variant's factory object.
pub struct TypeResolver<'m> {
    manifest: &'m Manifest,
    type_names: HashMap<&'m str, String>,
    payload_names: HashMap<&'m str, String>,
    used: HashSet<String>,
}

impl<'m> TypeResolver<'m> {
    pub fn new(manifest: &'m Manifest) -> Self {
        Self::with_reserved(manifest, std::iter::empty::<&str>())
    }

    /// Like [`TypeResolver::new`], with extra names that declarations must
    /// not take, e.g. imports and helpers of the surrounding document.
    pub fn with_reserved<'r>(
        manifest: &'m Manifest,
        reserved: impl IntoIterator<Item = &'r str>,
    ) -> Self {
        let mut used: HashSet<String> = [BINARY_TYPE, EVENT_UNION]
            .into_iter()
            .chain(reserved)
            .map(str::to_string)
            .collect();

        let mut type_names = HashMap::new();
        for (name, _) in manifest.types() {
            let ident = unique_identifier(&format_identifier(name), &mut used);
            type_names.insert(name, ident);
        }

        let mut payload_names = HashMap::new();
        for (name, def) in manifest.types() {
            if let (TypeDef::Variant(_), Some(ident)) = (def, type_names.get(name)) {
                let payload = unique_identifier(&format!("{ident}Payload"), &mut used);
                payload_names.insert(name, payload);
            }
        }

        Self {
            manifest,
            type_names,
            payload_names,
            used,
        }
    }

    pub fn manifest(&self) -> &'m Manifest {
        self.manifest
    }

    /// Identifiers already claimed by declarations, for callers that add
    /// more top-level names.
    pub fn used_names(&self) -> HashSet<String> {
        self.used.clone()
    }

    /// Declared identifier for a type table entry.
    pub fn type_name(&self, name: &str) -> Result<&str, AbiError> {
        self.type_names
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| missing_type(name))
    }

    /// Tagged-union type name of a variant.
    pub fn payload_name(&self, name: &str) -> Result<&str, AbiError> {
        self.payload_names
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AbiError::Internal(format!("type '{name}' is not a variant")))
    }

    /// TypeScript type expression for `ty`, without site nullability.
    pub fn resolve(&self, ty: &TypeRef) -> Result<String, AbiError> {
        match ty {
            TypeRef::Reference(name) => self.resolve_reference(name),
            TypeRef::Scalar(scalar) => Ok(scalar_type(*scalar).to_string()),
            TypeRef::Bytes(_) => Ok(BINARY_TYPE.to_string()),
            TypeRef::List(items) => Ok(format!("{}[]", self.resolve(items)?)),
            TypeRef::Map { key, value } => Ok(format!(
                "Record<{}, {}>",
                self.resolve(key)?,
                self.resolve(value)?
            )),
            TypeRef::Record(fields) => self.resolve_inline_record(fields),
        }
    }

    /// Property declarations for record fields, nullability applied.
    pub fn field_members(&self, fields: &[Field]) -> Result<Vec<String>, AbiError> {
        fields
            .iter()
            .map(|field| {
                let ty = with_nullability(self.resolve(field.ty())?, field.is_nullable());
                Ok(format!("{}: {ty}", format_property_name(field.name())))
            })
            .collect()
    }

    fn resolve_reference(&self, name: &str) -> Result<String, AbiError> {
        match self.lookup(name)? {
            TypeDef::Bytes(_) => Ok(BINARY_TYPE.to_string()),
            TypeDef::Variant(_) => self.payload_name(name).map(str::to_string),
            TypeDef::Record(_) | TypeDef::Alias(_) => self.type_name(name).map(str::to_string),
        }
    }

    fn resolve_inline_record(&self, fields: &[Field]) -> Result<String, AbiError> {
        if fields.is_empty() {
            return Ok("{}".to_string());
        }
        Ok(format!("{{ {} }}", self.field_members(fields)?.join("; ")))
    }

    fn lookup(&self, name: &str) -> Result<&'m TypeDef, AbiError> {
        self.manifest.type_def(name).ok_or_else(|| missing_type(name))
    }

    /// True when a value of `ty` can contain a byte sequence at any depth.
    pub fn is_binary(&self, ty: &TypeRef) -> bool {
        self.contains_binary(ty, &mut HashSet::new())
    }

    fn contains_binary<'a>(&'a self, ty: &'a TypeRef, visited: &mut HashSet<&'a str>) -> bool {
        match ty {
            TypeRef::Bytes(_) => true,
            TypeRef::Scalar(_) => false,
            TypeRef::List(items) => self.contains_binary(items, visited),
            TypeRef::Map { value, .. } => self.contains_binary(value, visited),
            TypeRef::Record(fields) => fields
                .iter()
                .any(|field| self.contains_binary(field.ty(), visited)),
            TypeRef::Reference(name) => {
                if !visited.insert(name.as_str()) {
                    return false;
                }
                match self.manifest.type_def(name) {
                    Some(TypeDef::Bytes(_)) => true,
                    Some(TypeDef::Alias(target)) => self.contains_binary(target, visited),
                    Some(TypeDef::Record(fields)) => fields
                        .iter()
                        .any(|field| self.contains_binary(field.ty(), visited)),
                    Some(TypeDef::Variant(cases)) => cases.iter().any(|case| {
                        case.payload()
                            .is_some_and(|payload| self.contains_binary(payload, visited))
                    }),
                    None => false,
                }
            }
        }
    }

    /// True for `unit`, directly or through aliases.
    pub fn is_unit(&self, ty: &TypeRef) -> bool {
        matches!(self.follow_aliases(ty), Some(TypeRef::Scalar(ScalarKind::Unit)))
    }

    /// Name of the variant `ty` designates, directly or through aliases.
    pub fn variant_of<'a>(&'a self, ty: &'a TypeRef) -> Option<&'a str> {
        let mut visited = HashSet::new();
        let mut current = ty;
        loop {
            let TypeRef::Reference(name) = current else {
                return None;
            };
            if !visited.insert(name.as_str()) {
                return None;
            }
            match self.manifest.type_def(name)? {
                TypeDef::Variant(_) => return Some(name.as_str()),
                TypeDef::Alias(target) => current = target,
                TypeDef::Record(_) | TypeDef::Bytes(_) => return None,
            }
        }
    }

    /// True when an alias only ever leads back to itself through other
    /// aliases, which has no legal TypeScript rendering.
    pub fn is_alias_cycle(&self, name: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = name;
        loop {
            if !visited.insert(current) {
                return current == name;
            }
            match self.manifest.type_def(current) {
                Some(TypeDef::Alias(TypeRef::Reference(next))) => current = next.as_str(),
                _ => return false,
            }
        }
    }

    /// Follows alias references until a non-alias reference or inline type.
    fn follow_aliases<'a>(&'a self, ty: &'a TypeRef) -> Option<&'a TypeRef> {
        let mut visited = HashSet::new();
        let mut current = ty;
        loop {
            let TypeRef::Reference(name) = current else {
                return Some(current);
            };
            if !visited.insert(name.as_str()) {
                return None;
            }
            match self.manifest.type_def(name)? {
                TypeDef::Alias(target) => current = target,
                _ => return Some(current),
            }
        }
    }
}

/// Appends `| null` for nullable sites.
pub fn with_nullability(ty: String, nullable: bool) -> String {
    if nullable {
        format!("{ty} | null")
    } else {
        ty
    }
}

fn scalar_type(scalar: ScalarKind) -> &'static str {
    match scalar {
        ScalarKind::Bool => "boolean",
        ScalarKind::I32
        | ScalarKind::I64
        | ScalarKind::U32
        | ScalarKind::U64
        | ScalarKind::F32
        | ScalarKind::F64 => "number",
        ScalarKind::String => "string",
        ScalarKind::Unit => "void",
    }
}

fn missing_type(name: &str) -> AbiError {
    AbiError::Internal(format!("type '{name}' is not declared"))
}
