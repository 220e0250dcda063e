//! Typed client class generation.
//!
//! The client document embeds the same declarations as the types document,
//! followed by the binary-value class, its wire converters and one async
//! wrapper per manifest method.

use std::collections::HashSet;

use crate::config::ClientConfig;
use crate::emit::{Document, Node};
use crate::error::AbiError;
use crate::ident::{
    format_identifier, format_property_name, property_access, string_literal, to_member_case,
    unique_identifier,
};
use crate::model::{Field, Manifest, Method, TypeDef, TypeRef};
use crate::resolve::{with_nullability, TypeResolver};
use crate::typescript_codegen::Declarations;

const RUNTIME_IMPORTS: [&str; 2] = ["CalimeroApp", "Context"];

/// Class members every client declares itself.
const RESERVED_MEMBERS: [&str; 3] = ["constructor", "app", "context"];

const TO_WIRE: &str = "convertAbiBytesForWasm";
const FROM_WIRE: &str = "convertWasmResultToAbiBytes";
const SHAPE_TYPE: &str = "AbiShape";

const ABI_BYTES_CLASS: &str = r#"
/**
 * Binary value exchanged with the remote component.
 */
export class AbiBytes {
  private data: Uint8Array;

  constructor(input: string | number[] | Uint8Array) {
    if (typeof input === 'string') {
      const hex = input.startsWith('0x') ? input.slice(2) : input;
      this.data = new Uint8Array(
        hex.match(/.{1,2}/g)?.map((byte) => parseInt(byte, 16)) || [],
      );
    } else if (Array.isArray(input)) {
      this.data = new Uint8Array(input);
    } else {
      this.data = input;
    }
  }

  toArray(): number[] {
    return Array.from(this.data);
  }

  toUint8Array(): Uint8Array {
    return this.data;
  }

  toHex(): string {
    return Array.from(this.data, (byte) => byte.toString(16).padStart(2, '0')).join('');
  }

  static fromHex(hex: string): AbiBytes {
    return new AbiBytes(hex);
  }

  static fromArray(arr: number[]): AbiBytes {
    return new AbiBytes(arr);
  }

  static fromUint8Array(bytes: Uint8Array): AbiBytes {
    return new AbiBytes(bytes);
  }
}
"#;

const WIRE_CONVERTERS: &str = r#"
/**
 * Where byte sequences sit inside a method result.
 */
type AbiShape =
  | 'bytes'
  | { list: AbiShape }
  | { map: AbiShape }
  | { record: Record<string, AbiShape> }
  | { variant: Record<string, AbiShape> };

/**
 * Replaces every AbiBytes instance with its number-array wire form.
 */
function convertAbiBytesForWasm(value: any): any {
  if (value === null || value === undefined) {
    return value;
  }
  if (value instanceof AbiBytes) {
    return value.toArray();
  }
  if (Array.isArray(value)) {
    return value.map((item) => convertAbiBytesForWasm(item));
  }
  if (typeof value === 'object') {
    const result: any = {};
    for (const [key, item] of Object.entries(value)) {
      result[key] = convertAbiBytesForWasm(item);
    }
    return result;
  }
  return value;
}

/**
 * Rebuilds AbiBytes instances at the positions marked by `shape`.
 */
function convertWasmResultToAbiBytes(value: any, shape: AbiShape): any {
  if (value === null || value === undefined) {
    return value;
  }
  if (shape === 'bytes') {
    return Array.isArray(value) ? new AbiBytes(value) : value;
  }
  if ('list' in shape) {
    const items = shape.list;
    return Array.isArray(value)
      ? value.map((item) => convertWasmResultToAbiBytes(item, items))
      : value;
  }
  if (typeof value !== 'object') {
    return value;
  }
  if ('map' in shape) {
    const result: any = {};
    for (const [key, item] of Object.entries(value)) {
      result[key] = convertWasmResultToAbiBytes(item, shape.map);
    }
    return result;
  }
  const members = 'record' in shape ? shape.record : shape.variant;
  const result: any = { ...value };
  for (const [key, inner] of Object.entries(members)) {
    if (key in result) {
      result[key] = convertWasmResultToAbiBytes(result[key], inner);
    }
  }
  return result;
}
"#;

/// Names the client document declares outside the manifest's types.
///
/// Both documents resolve with the same reserved set so their declarations
/// stay identical.
pub(crate) fn reserved_names(config: &ClientConfig) -> Vec<&str> {
    let mut names: Vec<&str> = RUNTIME_IMPORTS.to_vec();
    names.extend([TO_WIRE, FROM_WIRE, SHAPE_TYPE, config.client_name()]);
    names
}

/// Generates the client document: declarations plus the client class.
pub fn generate_client(manifest: &Manifest, config: &ClientConfig) -> Result<String, AbiError> {
    let resolver = TypeResolver::with_reserved(manifest, reserved_names(config));
    let declarations = Declarations::build(&resolver)?;

    let mut doc = Document::generated();
    doc.push(Node::block(
        "import {",
        RUNTIME_IMPORTS
            .iter()
            .map(|name| Node::line(format!("{name},")))
            .collect(),
        format!("}} from {};", string_literal(config.import_path())),
    ));
    doc.push(Node::Blank);
    doc.push(Node::line("// Generated types"));
    doc.push(Node::Blank);
    doc.extend(declarations.nodes.iter().cloned());
    doc.push(Node::Blank);
    doc.push(Node::Snippet(ABI_BYTES_CLASS));
    doc.push(Node::Blank);
    doc.push(Node::Snippet(WIRE_CONVERTERS));
    doc.push(Node::Blank);
    doc.push(client_class(&resolver, &declarations, config)?);
    Ok(doc.render())
}

fn client_class(
    resolver: &TypeResolver<'_>,
    declarations: &Declarations,
    config: &ClientConfig,
) -> Result<Node, AbiError> {
    let class_name = config.client_name();
    let mut used: HashSet<String> = RESERVED_MEMBERS.iter().map(|m| m.to_string()).collect();

    let mut body = vec![
        Node::line("private app: CalimeroApp;"),
        Node::line("private context: Context;"),
        Node::Blank,
        Node::block(
            "constructor(app: CalimeroApp, context: Context) {",
            vec![
                Node::line("this.app = app;"),
                Node::line("this.context = context;"),
            ],
            "}",
        ),
    ];

    for method in resolver.manifest().methods() {
        let member = unique_identifier(&format_identifier(&to_member_case(method.name())), &mut used);
        let error_type = declarations.error_types.get(method.name()).map(String::as_str);
        body.push(Node::Blank);
        body.extend(client_method(resolver, method, &member, error_type)?);
    }

    Ok(Node::block(format!("export class {class_name} {{"), body, "}"))
}

/// Doc comment and async wrapper for one method.
fn client_method(
    resolver: &TypeResolver<'_>,
    method: &Method,
    member: &str,
    error_type: Option<&str>,
) -> Result<Vec<Node>, AbiError> {
    let returns = match method.returns() {
        Some(ty) if !resolver.is_unit(ty) => Some(ty),
        _ => None,
    };
    let return_type = match returns {
        Some(ty) => with_nullability(resolver.resolve(ty)?, method.returns_nullable()),
        None => "void".to_string(),
    };

    let mut doc_lines = vec![method.name().to_string()];
    if let Some(error_type) = error_type {
        doc_lines.push(String::new());
        doc_lines.push(format!(
            "@throws {{{error_type}}} May throw the following errors:"
        ));
        for error in method.errors() {
            match error.payload().filter(|payload| !resolver.is_unit(payload)) {
                Some(payload) => doc_lines.push(format!(
                    "- {}: {}",
                    error.code(),
                    resolver.resolve(payload)?
                )),
                None => doc_lines.push(format!("- {}", error.code())),
            }
        }
    }

    let mut body = Vec::new();
    let signature = if method.params().is_empty() {
        format!("public async {member}(): Promise<{return_type}> {{")
    } else {
        let mut fields = Vec::with_capacity(method.params().len());
        for param in method.params() {
            let ty = with_nullability(resolver.resolve(param.ty())?, param.is_nullable());
            fields.push(format!("{}: {ty}", format_property_name(param.name())));
        }
        format!(
            "public async {member}(params: {{ {} }}): Promise<{return_type}> {{",
            fields.join("; ")
        )
    };

    let args = pack_arguments(resolver, method, &mut body);
    body.push(Node::line(format!(
        "const response = await this.app.execute(this.context, {}, {args});",
        string_literal(method.name())
    )));

    let success = match returns {
        Some(ty) => match result_shape(resolver.manifest(), ty, &mut Vec::new()) {
            Some(shape) => {
                format!("return {FROM_WIRE}(response.result, {shape}) as {return_type};")
            }
            None => format!("return response.result as {return_type};"),
        },
        None => "return;".to_string(),
    };
    body.push(Node::block("if (response.success) {", vec![Node::line(success)], "}"));

    if let Some(error_type) = error_type {
        body.push(Node::block(
            "if (response.error && typeof response.error === 'object') {",
            vec![Node::line(format!("throw response.error as {error_type};"))],
            "}",
        ));
    }
    body.push(Node::line(
        "throw new Error(response.error || 'Execution failed');",
    ));

    Ok(vec![
        Node::DocComment(doc_lines),
        Node::block(signature, body, "}"),
    ])
}

/// Emits the pre-call transforms and returns the argument expression.
///
/// Variant parameters are rewritten to their wire form (`{ Case: payload }`
/// or the bare case name) on a shallow copy; binary values anywhere in the
/// arguments go through the wire converter.
fn pack_arguments(resolver: &TypeResolver<'_>, method: &Method, body: &mut Vec<Node>) -> String {
    if method.params().is_empty() {
        return "{}".to_string();
    }

    let variant_params: Vec<&str> = method
        .params()
        .iter()
        .filter(|param| resolver.variant_of(param.ty()).is_some())
        .map(|param| param.name())
        .collect();

    let mut args = if variant_params.is_empty() {
        "params".to_string()
    } else {
        body.push(Node::line("const args = { ...params } as any;"));
        for name in variant_params {
            let value = format!("args{}", property_access(name));
            body.push(Node::block(
                format!("if ({value} && typeof {value} === 'object' && 'name' in {value}) {{"),
                vec![Node::line(format!(
                    "{value} = 'payload' in {value} ? {{ [{value}.name]: {value}.payload }} : {value}.name;"
                ))],
                "}",
            ));
        }
        "args".to_string()
    };

    if method.params().iter().any(|param| resolver.is_binary(param.ty())) {
        args = format!("{TO_WIRE}({args})");
    }
    args
}

/// `AbiShape` literal locating the byte sequences in a value of `ty`, or
/// `None` when it holds none.
///
/// Named types already being expanded are not entered again, so a recursive
/// type is converted down to its first repetition.
fn result_shape<'a>(
    manifest: &'a Manifest,
    ty: &'a TypeRef,
    expanding: &mut Vec<&'a str>,
) -> Option<String> {
    match ty {
        TypeRef::Bytes(_) => Some("'bytes'".to_string()),
        TypeRef::Scalar(_) => None,
        TypeRef::List(items) => {
            result_shape(manifest, items, expanding).map(|shape| format!("{{ list: {shape} }}"))
        }
        TypeRef::Map { value, .. } => {
            result_shape(manifest, value, expanding).map(|shape| format!("{{ map: {shape} }}"))
        }
        TypeRef::Record(fields) => record_shape(manifest, fields, expanding),
        TypeRef::Reference(name) => {
            if expanding.contains(&name.as_str()) {
                return None;
            }
            expanding.push(name);
            let shape = match manifest.type_def(name) {
                Some(TypeDef::Bytes(_)) => Some("'bytes'".to_string()),
                Some(TypeDef::Alias(target)) => result_shape(manifest, target, expanding),
                Some(TypeDef::Record(fields)) => record_shape(manifest, fields, expanding),
                Some(TypeDef::Variant(cases)) => {
                    let members = cases
                        .iter()
                        .filter_map(|case| case.payload().map(|payload| (case.name(), payload)));
                    members_shape("variant", manifest, members, expanding)
                }
                None => None,
            };
            expanding.pop();
            shape
        }
    }
}

fn record_shape<'a>(
    manifest: &'a Manifest,
    fields: &'a [Field],
    expanding: &mut Vec<&'a str>,
) -> Option<String> {
    let members = fields.iter().map(|field| (field.name(), field.ty()));
    members_shape("record", manifest, members, expanding)
}

fn members_shape<'a>(
    kind: &str,
    manifest: &'a Manifest,
    members: impl Iterator<Item = (&'a str, &'a TypeRef)>,
    expanding: &mut Vec<&'a str>,
) -> Option<String> {
    let mut entries = Vec::new();
    for (name, ty) in members {
        if let Some(shape) = result_shape(manifest, ty, expanding) {
            entries.push(format!("{}: {shape}", format_property_name(name)));
        }
    }
    if entries.is_empty() {
        None
    } else {
        Some(format!("{{ {kind}: {{ {} }} }}", entries.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::generate_client;
    use crate::config::ClientConfig;
    use crate::parse_manifest;

    fn render(manifest: serde_json::Value) -> String {
        let manifest = parse_manifest(&manifest).unwrap();
        generate_client(&manifest, &ClientConfig::new("TestClient")).unwrap()
    }

    #[test]
    fn zero_param_method_passes_empty_record() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {},
            "methods": [{ "name": "get_count", "params": [], "returns": { "kind": "u64" } }],
            "events": []
        }));

        assert!(rendered.contains("public async getCount(): Promise<number> {"));
        assert!(rendered
            .contains("const response = await this.app.execute(this.context, 'get_count', {});"));
        assert!(rendered.contains("return response.result as number;"));
    }

    #[test]
    fn class_has_runtime_fields_and_constructor() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {},
            "methods": [],
            "events": []
        }));

        assert!(rendered.contains("import {\n  CalimeroApp,\n  Context,\n} from '@calimero-network/calimero-client';"));
        assert!(rendered.contains("export class AbiBytes {"));
        assert!(rendered.contains("function convertAbiBytesForWasm(value: any): any {"));
        assert!(rendered.contains(
            "export class TestClient {\n  private app: CalimeroApp;\n  private context: Context;\n\n  constructor(app: CalimeroApp, context: Context) {\n    this.app = app;\n    this.context = context;\n  }\n}\n"
        ));
    }

    #[test]
    fn variant_params_are_converted_before_the_call() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {
                "Action": { "kind": "variant", "variants": [
                    { "name": "Ping" },
                    { "name": "SetName", "payload": { "kind": "string" } }
                ] }
            },
            "methods": [{
                "name": "act",
                "params": [
                    { "name": "action", "type": { "$ref": "Action" } },
                    { "name": "note", "type": { "kind": "string" } }
                ],
                "returns": { "kind": "u32" }
            }],
            "events": []
        }));

        assert!(rendered.contains(
            "public async act(params: { action: ActionPayload; note: string }): Promise<number> {"
        ));
        assert!(rendered.contains("    const args = { ...params } as any;\n"));
        assert!(rendered.contains(
            "    if (args.action && typeof args.action === 'object' && 'name' in args.action) {\n      args.action = 'payload' in args.action ? { [args.action.name]: args.action.payload } : args.action.name;\n    }\n"
        ));
        assert!(rendered.contains("this.app.execute(this.context, 'act', args);"));
        assert!(!rendered.contains("args.note"));
    }

    #[test]
    fn binary_params_and_returns_use_converters() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {
                "UserId": { "kind": "bytes", "size": 32 }
            },
            "methods": [
                {
                    "name": "roundtrip_id",
                    "params": [{ "name": "ids", "type": { "kind": "list", "items": { "$ref": "UserId" } } }],
                    "returns": { "$ref": "UserId" },
                    "returns_nullable": true
                },
                {
                    "name": "echo",
                    "params": [{ "name": "text", "type": { "kind": "string" } }],
                    "returns": { "kind": "string" }
                }
            ],
            "events": []
        }));

        assert!(rendered.contains(
            "public async roundtripId(params: { ids: AbiBytes[] }): Promise<AbiBytes | null> {"
        ));
        assert!(rendered.contains(
            "this.app.execute(this.context, 'roundtrip_id', convertAbiBytesForWasm(params));"
        ));
        assert!(rendered.contains(
            "return convertWasmResultToAbiBytes(response.result, 'bytes') as AbiBytes | null;"
        ));
        assert!(rendered.contains("this.app.execute(this.context, 'echo', params);"));
    }

    #[test]
    fn declared_errors_are_rethrown_structured() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {},
            "methods": [{
                "name": "may_fail",
                "params": [{ "name": "flag", "type": { "kind": "bool" } }],
                "errors": [
                    { "code": "NOT_FOUND", "payload": { "kind": "string" } },
                    { "code": "FORBIDDEN" }
                ]
            }],
            "events": []
        }));

        assert!(rendered.contains(
            "  /**\n   * may_fail\n   *\n   * @throws {MayFailError} May throw the following errors:\n   * - NOT_FOUND: string\n   * - FORBIDDEN\n   */\n"
        ));
        assert!(rendered.contains("public async mayFail(params: { flag: boolean }): Promise<void> {"));
        assert!(rendered.contains("      return;\n"));
        assert!(rendered.contains("      throw response.error as MayFailError;\n"));
        assert!(rendered.contains("    throw new Error(response.error || 'Execution failed');\n"));
    }

    #[test]
    fn member_names_stay_unique() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {},
            "methods": [
                { "name": "get_value", "params": [] },
                { "name": "getValue", "params": [] },
                { "name": "context", "params": [] }
            ],
            "events": []
        }));

        assert!(rendered.contains("public async getValue(): Promise<void> {"));
        assert!(rendered.contains("public async getValue2(): Promise<void> {"));
        assert!(rendered.contains("public async context2(): Promise<void> {"));
    }

    #[test]
    fn manifest_types_do_not_shadow_document_names() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {
                "Context": { "kind": "record", "fields": [{ "name": "id", "type": { "kind": "string" } }] },
                "CalimeroApp": { "kind": "alias", "target": { "kind": "string" } },
                "TestClient": { "kind": "record", "fields": [] },
                "AbiShape": { "kind": "alias", "target": { "kind": "u32" } }
            },
            "methods": [{
                "name": "current",
                "params": [{ "name": "app", "type": { "$ref": "CalimeroApp" } }],
                "returns": { "$ref": "Context" }
            }],
            "events": []
        }));

        assert!(rendered.contains("export interface Context2 {"));
        assert!(rendered.contains("export type CalimeroApp2 = string;"));
        assert!(rendered.contains("export interface TestClient2 {}"));
        assert!(rendered.contains("export type AbiShape2 = number;"));
        assert!(!rendered.contains("export interface Context {"));
        assert!(rendered.contains("  private context: Context;\n"));
        assert!(rendered.contains(
            "public async current(params: { app: CalimeroApp2 }): Promise<Context2> {"
        ));
    }

    #[test]
    fn result_conversion_follows_the_return_type() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {
                "Blob": { "kind": "bytes" },
                "Stats": { "kind": "record", "fields": [
                    { "name": "counts", "type": { "kind": "list", "items": { "kind": "u32" } } },
                    { "name": "digest", "type": { "$ref": "Blob" } },
                    { "name": "parts", "type": { "kind": "map", "key": { "kind": "string" }, "value": { "kind": "list", "items": { "kind": "bytes" } } } }
                ] },
                "Outcome": { "kind": "variant", "variants": [
                    { "name": "Empty" },
                    { "name": "Data", "payload": { "$ref": "Blob" } }
                ] },
                "Tree": { "kind": "record", "fields": [
                    { "name": "leaf", "type": { "kind": "bytes" } },
                    { "name": "children", "type": { "kind": "list", "items": { "$ref": "Tree" } } }
                ] }
            },
            "methods": [
                { "name": "stats", "params": [], "returns": { "$ref": "Stats" } },
                { "name": "outcome", "params": [], "returns": { "$ref": "Outcome" } },
                { "name": "tree", "params": [], "returns": { "$ref": "Tree" } },
                { "name": "counts", "params": [], "returns": { "kind": "list", "items": { "kind": "u32" } } }
            ],
            "events": []
        }));

        assert!(rendered.contains(
            "return convertWasmResultToAbiBytes(response.result, { record: { digest: 'bytes', parts: { map: { list: 'bytes' } } } }) as Stats;"
        ));
        assert!(rendered.contains(
            "return convertWasmResultToAbiBytes(response.result, { variant: { Data: 'bytes' } }) as OutcomePayload;"
        ));
        assert!(rendered.contains(
            "return convertWasmResultToAbiBytes(response.result, { record: { leaf: 'bytes' } }) as Tree;"
        ));
        assert!(rendered.contains("return response.result as number[];"));
    }

    #[test]
    fn comment_terminators_in_names_stay_inside_the_comment() {
        let rendered = render(json!({
            "schema_version": "wasm-abi/1",
            "types": {},
            "methods": [{
                "name": "evil*/ foo",
                "params": [],
                "errors": [{ "code": "BAD*/CODE" }]
            }],
            "events": []
        }));

        assert!(rendered.contains("   * evil*\\/ foo\n"));
        assert!(rendered.contains("   * - BAD*\\/CODE\n"));
        assert!(!rendered.contains("* evil*/"));
        assert!(rendered.contains("public async evil___foo(): Promise<void> {"));
        assert!(rendered.contains("this.app.execute(this.context, 'evil*/ foo', {});"));
    }
}
