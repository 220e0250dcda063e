//! TypeScript type declarations for a validated manifest.
//!
//! Emission follows manifest declaration order: type table entries, then
//! per-method error types, then per-event payload aliases and the
//! [`EVENT_UNION`] aggregate.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::client_codegen::reserved_names;
use crate::config::ClientConfig;
use crate::emit::{Document, Node};
use crate::error::AbiError;
use crate::ident::{
    format_identifier, format_property_name, string_literal, to_type_case, unique_identifier,
};
use crate::model::{ByteLength, Event, Manifest, Method, TypeDef, TypeRef};
use crate::resolve::{TypeResolver, BINARY_TYPE, EVENT_UNION};

/// Generates the standalone type declarations document.
///
/// The binary-value class lives in the client document, so this document
/// imports it from `./<ClientName>.js`.
pub fn generate_types(manifest: &Manifest, config: &ClientConfig) -> Result<String, AbiError> {
    let resolver = TypeResolver::with_reserved(manifest, reserved_names(config));
    let declarations = Declarations::build(&resolver)?;

    let mut doc = Document::generated();
    doc.push(Node::line(format!(
        "import type {{ {BINARY_TYPE} }} from {};",
        string_literal(&config.client_module_specifier())
    )));
    doc.push(Node::Blank);
    doc.extend(declarations.nodes);
    Ok(doc.render())
}

/// Declaration nodes shared by the types and client documents.
pub(crate) struct Declarations {
    pub nodes: Vec<Node>,
    /// Method name -> name of its error union.
    pub error_types: HashMap<String, String>,
}

impl Declarations {
    pub fn build(resolver: &TypeResolver<'_>) -> Result<Self, AbiError> {
        let manifest = resolver.manifest();
        let mut used = resolver.used_names();
        let mut nodes = Vec::new();

        for (name, def) in manifest.types() {
            nodes.extend(type_definition(resolver, name, def)?);
            nodes.push(Node::Blank);
        }

        let mut error_types = HashMap::new();
        for method in manifest.methods() {
            if method.errors().is_empty() {
                continue;
            }
            let (error_nodes, error_type) = method_error_types(resolver, method, &mut used)?;
            nodes.extend(error_nodes);
            nodes.push(Node::Blank);
            error_types.insert(method.name().to_string(), error_type);
        }

        let mut event_payloads = Vec::with_capacity(manifest.events().len());
        for event in manifest.events() {
            let payload_alias = match event_payload(resolver, event) {
                Some(payload) => {
                    let base = format!("{}Payload", format_identifier(&to_type_case(event.name())));
                    let alias = unique_identifier(&base, &mut used);
                    nodes.push(Node::line(format!(
                        "export type {alias} = {};",
                        resolver.resolve(payload)?
                    )));
                    nodes.push(Node::Blank);
                    Some(alias)
                }
                None => None,
            };
            event_payloads.push((event, payload_alias));
        }

        if !event_payloads.is_empty() {
            nodes.extend(event_union(&event_payloads));
            nodes.push(Node::Blank);
        }

        Ok(Self { nodes, error_types })
    }
}

fn type_definition(
    resolver: &TypeResolver<'_>,
    name: &str,
    def: &TypeDef,
) -> Result<Vec<Node>, AbiError> {
    let ident = resolver.type_name(name)?;
    let nodes = match def {
        TypeDef::Record(fields) => {
            let body = resolver
                .field_members(fields)?
                .into_iter()
                .map(|member| Node::line(format!("{member};")))
                .collect();
            vec![Node::block(format!("export interface {ident} {{"), body, "}")]
        }
        TypeDef::Variant(cases) => {
            let payload_name = resolver.payload_name(name)?;
            let mut members = Vec::with_capacity(cases.len());
            let mut factories = Vec::with_capacity(cases.len());
            for case in cases {
                let tag = string_literal(case.name());
                let key = format_property_name(case.name());
                match case_payload(resolver, case.payload()) {
                    Some(payload) => {
                        let ty = resolver.resolve(payload)?;
                        members.push(format!("{{ name: {tag}; payload: {ty} }}"));
                        factories.push(Node::line(format!(
                            "{key}: (payload: {ty}): {payload_name} => ({{ name: {tag}, payload }}),"
                        )));
                    }
                    None => {
                        members.push(format!("{{ name: {tag} }}"));
                        factories.push(Node::line(format!(
                            "{key}: (): {payload_name} => ({{ name: {tag} }}),"
                        )));
                    }
                }
            }

            let mut nodes = union_alias(payload_name, &members);
            nodes.push(Node::Blank);
            nodes.push(Node::block(
                format!("export const {ident} = {{"),
                factories,
                "} as const;",
            ));
            nodes
        }
        TypeDef::Bytes(length) => {
            let mut nodes = Vec::new();
            if let ByteLength::Fixed(size) = length {
                nodes.push(Node::DocComment(vec![format!(
                    "Fixed-length bytes (size: {size})."
                )]));
            }
            nodes.push(Node::line(format!("export type {ident} = {BINARY_TYPE};")));
            nodes
        }
        TypeDef::Alias(target) => {
            let target = if resolver.is_alias_cycle(name) {
                warn!(alias = name, "alias only refers back to itself; emitting unknown");
                "unknown".to_string()
            } else {
                resolver.resolve(target)?
            };
            vec![Node::line(format!("export type {ident} = {target};"))]
        }
    };
    Ok(nodes)
}

/// Error code union and error value union for one method.
fn method_error_types(
    resolver: &TypeResolver<'_>,
    method: &Method,
    used: &mut HashSet<String>,
) -> Result<(Vec<Node>, String), AbiError> {
    let base = format_identifier(&to_type_case(method.name()));
    let code_type = unique_identifier(&format!("{base}ErrorCode"), used);
    let error_type = unique_identifier(&format!("{base}Error"), used);

    let codes: Vec<String> = method
        .errors()
        .iter()
        .map(|error| string_literal(error.code()))
        .collect();

    let mut members = Vec::with_capacity(method.errors().len());
    for error in method.errors() {
        let code = string_literal(error.code());
        match case_payload(resolver, error.payload()) {
            Some(payload) => members.push(format!(
                "{{ code: {code}; payload: {} }}",
                resolver.resolve(payload)?
            )),
            None => members.push(format!("{{ code: {code} }}")),
        }
    }

    let mut nodes = vec![Node::line(format!(
        "export type {code_type} = {};",
        codes.join(" | ")
    ))];
    nodes.extend(union_alias(&error_type, &members));
    Ok((nodes, error_type))
}

fn event_union(events: &[(&Event, Option<String>)]) -> Vec<Node> {
    let members: Vec<String> = events
        .iter()
        .map(|(event, alias)| {
            let tag = string_literal(event.name());
            match alias {
                Some(alias) => format!("{{ name: {tag}; payload: {alias} }}"),
                None => format!("{{ name: {tag} }}"),
            }
        })
        .collect();
    union_alias(EVENT_UNION, &members)
}

/// `export type Name =` followed by one `| member` line per member.
fn union_alias(name: &str, members: &[String]) -> Vec<Node> {
    if members.is_empty() {
        return vec![Node::line(format!("export type {name} = never;"))];
    }

    let mut nodes = vec![Node::line(format!("export type {name} ="))];
    let last = members.len() - 1;
    for (idx, member) in members.iter().enumerate() {
        let terminator = if idx == last { ";" } else { "" };
        nodes.push(Node::line(format!("  | {member}{terminator}")));
    }
    nodes
}

/// Payloads of kind `unit` are treated as absent.
fn case_payload<'a>(resolver: &TypeResolver<'_>, payload: Option<&'a TypeRef>) -> Option<&'a TypeRef> {
    payload.filter(|payload| !resolver.is_unit(payload))
}

/// The payload an event exposes, `None` for payload-less and unit events.
fn event_payload<'a>(resolver: &TypeResolver<'_>, event: &'a Event) -> Option<&'a TypeRef> {
    case_payload(resolver, event.payload())
}
