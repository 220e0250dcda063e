//! Identifier formatting for generated TypeScript.
//!
//! Manifest names are arbitrary strings; everything emitted as code goes
//! through one of the helpers here so that output is always a legal
//! identifier, property key or string literal.

use std::collections::HashSet;

/// Words that cannot be used verbatim as declaration names.
pub const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "as",
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
    "any",
    "await",
    "boolean",
    "constructor",
    "declare",
    "module",
    "number",
    "string",
    "symbol",
    "type",
    "keyof",
    "namespace",
    "abstract",
    "never",
    "object",
    "unknown",
    "bigint",
    "undefined",
];

/// Turns a raw name into a legal identifier.
///
/// Characters outside `[A-Za-z0-9_$]` become `_`, a leading digit gets a `_`
/// prefix and reserved words get a `_` suffix.
pub fn format_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|ch| if is_ident_char(ch) { ch } else { '_' })
        .collect();

    if out.is_empty() {
        return "_".to_string();
    }

    if out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert(0, '_');
    }

    if is_reserved_word(&out) {
        out.push('_');
    }

    out
}

/// Object-literal / interface key: bare when possible, quoted otherwise.
pub fn format_property_name(raw: &str) -> String {
    if is_valid_identifier(raw) {
        raw.to_string()
    } else {
        format!("\"{}\"", escape_string(raw, '"'))
    }
}

/// Member access expression for a key: `.name` or `["odd key"]`.
pub fn property_access(raw: &str) -> String {
    if is_valid_identifier(raw) {
        format!(".{raw}")
    } else {
        format!("[\"{}\"]", escape_string(raw, '"'))
    }
}

/// Single-quoted string literal.
pub fn string_literal(raw: &str) -> String {
    format!("'{}'", escape_string(raw, '\''))
}

/// `set_user_name` -> `SetUserName`. Characters after the first of each
/// word are kept as written.
pub fn to_type_case(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

/// `set_user_name` -> `setUserName`.
pub fn to_member_case(raw: &str) -> String {
    let type_case = to_type_case(raw);
    let mut chars = type_case.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives a client class name from a file path.
///
/// Directories and the last extension are dropped; the stem is split on
/// non-alphanumeric characters and each word capitalized. Words of one or two
/// characters are fully upper-cased (`kv_store.wasm` -> `KVStoreClient`).
///
/// ```
/// use abi_codegen::ident::derive_client_name_from_path;
///
/// assert_eq!(derive_client_name_from_path("kv_store.wasm"), "KVStoreClient");
/// assert_eq!(derive_client_name_from_path("abi-conformance.wasm"), "AbiConformanceClient");
/// assert_eq!(derive_client_name_from_path(""), "Client");
/// assert_eq!(derive_client_name_from_path("a"), "AClient");
/// ```
pub fn derive_client_name_from_path(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match file_name.rfind('.') {
        Some(index) if index > 0 => &file_name[..index],
        _ => file_name,
    };

    let mut name: String = stem
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.chars().count() <= 2 {
                word.to_ascii_uppercase()
            } else {
                capitalize(word)
            }
        })
        .collect();

    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        name.insert_str(0, "Abi");
    }

    name.push_str("Client");
    name
}

/// Returns `base`, or `base2`, `base3`, ... if already taken.
pub fn unique_identifier(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }

    let mut idx = 2usize;
    loop {
        let candidate = format!("{base}{idx}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        idx += 1;
    }
}

/// True for a non-reserved `[A-Za-z_$][A-Za-z0-9_$]*`.
pub fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !(first == '_' || first == '$' || first.is_ascii_alphabetic()) {
        return false;
    }

    chars.all(is_ident_char) && !is_reserved_word(text)
}

pub fn is_reserved_word(text: &str) -> bool {
    RESERVED_WORDS.contains(&text)
}

fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_ascii_alphanumeric()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn escape_string(raw: &str, quote: char) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn derives_client_names_from_paths() {
        assert_eq!(derive_client_name_from_path("kv_store.wasm"), "KVStoreClient");
        assert_eq!(derive_client_name_from_path("/tmp/kv_store.wasm"), "KVStoreClient");
        assert_eq!(
            derive_client_name_from_path("abi-conformance.wasm"),
            "AbiConformanceClient"
        );
        assert_eq!(derive_client_name_from_path("abi-conformance"), "AbiConformanceClient");
        assert_eq!(derive_client_name_from_path(""), "Client");
        assert_eq!(derive_client_name_from_path("a"), "AClient");
        assert_eq!(derive_client_name_from_path("ab"), "ABClient");
        assert_eq!(derive_client_name_from_path("abc"), "AbcClient");
        assert_eq!(derive_client_name_from_path("C:\\apps\\kv_store.wasm"), "KVStoreClient");
        assert_eq!(derive_client_name_from_path("dir/"), "Client");
        assert_eq!(derive_client_name_from_path("2fa.wasm"), "Abi2faClient");
    }

    #[test]
    fn casing_splits_on_underscores() {
        assert_eq!(to_type_case("set_user_name"), "SetUserName");
        assert_eq!(to_type_case("__may__fail"), "MayFail");
        assert_eq!(to_type_case("getHTTP"), "GetHTTP");
        assert_eq!(to_member_case("set_user_name"), "setUserName");
        assert_eq!(to_member_case("Ping"), "ping");
        assert_eq!(to_member_case(""), "");
    }

    #[test]
    fn identifiers_avoid_reserved_words_and_digits() {
        assert_eq!(format_identifier("delete"), "delete_");
        assert_eq!(format_identifier("9lives"), "_9lives");
        assert_eq!(format_identifier("user-id"), "user_id");
        assert_eq!(format_identifier(""), "_");
        assert_eq!(format_identifier("Person"), "Person");
    }

    #[test]
    fn property_names_quote_only_when_needed() {
        assert_eq!(format_property_name("name"), "name");
        assert_eq!(format_property_name("default"), "\"default\"");
        assert_eq!(format_property_name("x-y"), "\"x-y\"");
        assert_eq!(property_access("name"), ".name");
        assert_eq!(property_access("a\"b"), "[\"a\\\"b\"]");
    }

    #[test]
    fn string_literals_escape_quotes() {
        assert_eq!(string_literal("it's"), "'it\\'s'");
        assert_eq!(string_literal("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn unique_identifier_appends_counter() {
        let mut used = HashSet::new();
        assert_eq!(unique_identifier("Foo", &mut used), "Foo");
        assert_eq!(unique_identifier("Foo", &mut used), "Foo2");
        assert_eq!(unique_identifier("Foo", &mut used), "Foo3");
        assert_eq!(unique_identifier("Bar", &mut used), "Bar");
    }
}
