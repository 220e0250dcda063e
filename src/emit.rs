//! Structured builder for generated source documents.
//!
//! Generators push typed [`Node`]s instead of concatenating strings; layout
//! (indentation, blank-line runs, empty blocks, trailing newline) is decided
//! in one place by [`Document::render`], so equal node lists always render to
//! identical bytes.

/// First line of every generated document.
pub const GENERATED_BANNER: &str = "/** @generated by abi-codegen - DO NOT EDIT. */";

const INDENT: &str = "  ";

/// One emission unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A single line of code at the current depth.
    Line(String),
    /// Separator; runs collapse to one and edges are dropped.
    Blank,
    /// `/** ... */` comment, one entry per line. A `*/` inside an entry is
    /// escaped so it cannot close the comment.
    DocComment(Vec<String>),
    /// `open`, indented body, `close`. Renders as `open` + `close` on one
    /// line when the body is empty.
    Block {
        open: String,
        body: Vec<Node>,
        close: String,
    },
    /// Verbatim multi-line text, re-indented to the current depth.
    Snippet(&'static str),
}

impl Node {
    pub fn line(text: impl Into<String>) -> Self {
        Node::Line(text.into())
    }

    pub fn block(open: impl Into<String>, body: Vec<Node>, close: impl Into<String>) -> Self {
        Node::Block {
            open: open.into(),
            body,
            close: close.into(),
        }
    }
}

/// Ordered list of nodes making up one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document that starts with [`GENERATED_BANNER`].
    pub fn generated() -> Self {
        let mut doc = Self::new();
        doc.push(Node::line(GENERATED_BANNER));
        doc.push(Node::Blank);
        doc
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.nodes.extend(nodes);
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        render_nodes(&self.nodes, 0, &mut lines);
        let lines = normalize(lines);

        let mut out = String::new();
        for line in lines {
            if let Some(text) = line {
                out.push_str(&text);
            }
            out.push('\n');
        }
        out
    }
}

// `None` marks a blank line.
type RenderedLine = Option<String>;

fn render_nodes(nodes: &[Node], depth: usize, out: &mut Vec<RenderedLine>) {
    for node in nodes {
        match node {
            Node::Line(text) => out.push(Some(indent(depth, text))),
            Node::Blank => out.push(None),
            Node::DocComment(lines) => render_doc_comment(lines, depth, out),
            Node::Block { open, body, close } => {
                let mut inner = Vec::new();
                render_nodes(body, depth + 1, &mut inner);
                let inner = normalize(inner);
                if inner.is_empty() {
                    out.push(Some(indent(depth, &format!("{open}{close}"))));
                } else {
                    out.push(Some(indent(depth, open)));
                    out.extend(inner);
                    out.push(Some(indent(depth, close)));
                }
            }
            Node::Snippet(text) => {
                for line in text.trim_matches('\n').lines() {
                    if line.trim().is_empty() {
                        out.push(None);
                    } else {
                        out.push(Some(indent(depth, line)));
                    }
                }
            }
        }
    }
}

fn render_doc_comment(lines: &[String], depth: usize, out: &mut Vec<RenderedLine>) {
    match lines {
        [] => {}
        [single] => out.push(Some(indent(
            depth,
            &format!("/** {} */", escape_comment(single)),
        ))),
        _ => {
            out.push(Some(indent(depth, "/**")));
            for line in lines {
                if line.is_empty() {
                    out.push(Some(indent(depth, " *")));
                } else {
                    out.push(Some(indent(depth, &format!(" * {}", escape_comment(line)))));
                }
            }
            out.push(Some(indent(depth, " */")));
        }
    }
}

fn escape_comment(text: &str) -> String {
    text.replace("*/", "*\\/")
}

fn normalize(lines: Vec<RenderedLine>) -> Vec<RenderedLine> {
    let mut out: Vec<RenderedLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_none() && matches!(out.last(), None | Some(None)) {
            continue;
        }
        out.push(line);
    }
    while matches!(out.last(), Some(None)) {
        out.pop();
    }
    out
}

fn indent(depth: usize, text: &str) -> String {
    format!("{}{text}", INDENT.repeat(depth))
}

#[cfg(test)]
mod tests {
    use super::{Document, Node, GENERATED_BANNER};

    #[test]
    fn renders_nested_blocks_with_two_space_indent() {
        let mut doc = Document::new();
        doc.push(Node::block(
            "export class A {",
            vec![Node::block(
                "run(): void {",
                vec![Node::line("return;")],
                "}",
            )],
            "}",
        ));
        assert_eq!(
            doc.render(),
            "export class A {\n  run(): void {\n    return;\n  }\n}\n"
        );
    }

    #[test]
    fn empty_blocks_collapse_to_one_line() {
        let mut doc = Document::new();
        doc.push(Node::block("export interface Empty {", vec![Node::Blank], "}"));
        assert_eq!(doc.render(), "export interface Empty {}\n");
    }

    #[test]
    fn blank_runs_collapse_and_edges_are_trimmed() {
        let mut doc = Document::generated();
        doc.extend([Node::Blank, Node::Blank, Node::line("a"), Node::Blank, Node::Blank]);
        assert_eq!(doc.render(), format!("{GENERATED_BANNER}\n\na\n"));
    }

    #[test]
    fn doc_comments_use_single_line_form_when_possible() {
        let mut doc = Document::new();
        doc.push(Node::DocComment(vec!["one".to_string()]));
        doc.push(Node::DocComment(vec![
            "two".to_string(),
            String::new(),
            "three".to_string(),
        ]));
        assert_eq!(doc.render(), "/** one */\n/**\n * two\n *\n * three\n */\n");
    }

    #[test]
    fn doc_comments_cannot_be_closed_early() {
        let mut doc = Document::new();
        doc.push(Node::DocComment(vec!["a */ b".to_string()]));
        doc.push(Node::DocComment(vec!["x*/".to_string(), "*/*/".to_string()]));
        assert_eq!(
            doc.render(),
            "/** a *\\/ b */\n/**\n * x*\\/\n * *\\/*\\/\n */\n"
        );
    }

    #[test]
    fn snippets_are_reindented() {
        let mut doc = Document::new();
        doc.push(Node::block(
            "{",
            vec![Node::Snippet("\nfoo();\n\nbar();\n")],
            "}",
        ));
        assert_eq!(doc.render(), "{\n  foo();\n\n  bar();\n}\n");
    }
}
