//! Static Python parsing helpers built on tree-sitter
//!
//! Everything the pipeline knows about user source code comes from walking
//! syntax trees; no scanned file is ever imported or executed. This module
//! owns the parser setup and the small vocabulary of node readers shared by
//! the catalog collector (assignment literals), the service scanner
//! (decorated callables), and the type-reference collector (class
//! declarations).

use crate::error::{Result, ToolsmithError};
use serde_json::Value;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// A parsed Python source file
///
/// Owns both the source text and the syntax tree so callers can hold nodes
/// borrowed from it without lifetime gymnastics.
pub struct PythonSource {
    content: String,
    tree: Tree,
}

impl PythonSource {
    /// Parse `content` as Python
    ///
    /// A tree containing error nodes is still returned (tree-sitter recovers
    /// around them); only a parser-level failure is an error.
    pub fn parse(path: &Path, content: String) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ToolsmithError::SourceParse {
                path: path.to_path_buf(),
                message: format!("failed to initialize Python grammar: {e}"),
            })?;

        let tree = parser
            .parse(&content, None)
            .ok_or_else(|| ToolsmithError::SourceParse {
                path: path.to_path_buf(),
                message: "tree-sitter returned no tree".to_string(),
            })?;

        if tree.root_node().has_error() {
            tracing::warn!(
                "syntax errors in {}, extracting what parses",
                path.display()
            );
        }

        Ok(Self { content, tree })
    }

    /// Read a file from disk and parse it
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, content)
    }

    /// The module root node
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text of a node
    pub fn text(&self, node: Node<'_>) -> &str {
        &self.content[node.start_byte()..node.end_byte()]
    }
}

/// Decode a Python string literal node to its text value
///
/// Handles the usual quote styles and common escape sequences. Returns `None`
/// for f-strings with interpolations, which are not literals.
pub fn string_literal(node: Node<'_>, src: &PythonSource) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut out = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            // escape_sequence nodes nest inside string_content; the byte
            // spans between them are verbatim text
            "string_content" => {
                let mut pos = child.start_byte();
                let mut inner = child.walk();
                for escape in child.named_children(&mut inner) {
                    if escape.kind() != "escape_sequence" {
                        continue;
                    }
                    out.push_str(&src.content[pos..escape.start_byte()]);
                    out.push_str(&decode_escape(src.text(escape)));
                    pos = escape.end_byte();
                }
                out.push_str(&src.content[pos..child.end_byte()]);
            }
            "interpolation" => return None,
            _ => {}
        }
    }
    Some(out)
}

fn decode_escape(seq: &str) -> String {
    match seq {
        "\\n" => "\n".to_string(),
        "\\t" => "\t".to_string(),
        "\\r" => "\r".to_string(),
        "\\\\" => "\\".to_string(),
        "\\'" => "'".to_string(),
        "\\\"" => "\"".to_string(),
        "\\0" => "\0".to_string(),
        other => {
            // \uXXXX and \xXX forms; anything else passes through verbatim
            let decoded = other
                .strip_prefix("\\u")
                .or_else(|| other.strip_prefix("\\x"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .and_then(char::from_u32);
            match decoded {
                Some(c) => c.to_string(),
                None => other.to_string(),
            }
        }
    }
}

/// Convert a Python literal expression node to a JSON value
///
/// Covers the literal subset a hand-authored catalog uses: strings, numbers
/// (including negated), booleans, `None`, lists, tuples, and dictionaries
/// with literal keys. Returns `None` for anything that would require
/// evaluation.
pub fn literal_to_json(node: Node<'_>, src: &PythonSource) -> Option<Value> {
    match node.kind() {
        "string" => string_literal(node, src).map(Value::String),
        "integer" => {
            let text = src.text(node);
            text.parse::<i64>()
                .ok()
                .map(Value::from)
                .or_else(|| text.parse::<f64>().ok().and_then(float_value))
        }
        "float" => src.text(node).parse::<f64>().ok().and_then(float_value),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "none" => Some(Value::Null),
        "list" | "tuple" | "set" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                items.push(literal_to_json(child, src)?);
            }
            Some(Value::Array(items))
        }
        "dictionary" => {
            let mut map = serde_json::Map::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "pair" => {
                        let key_node = child.child_by_field_name("key")?;
                        let value_node = child.child_by_field_name("value")?;
                        let key = match key_node.kind() {
                            "string" => string_literal(key_node, src)?,
                            _ => src.text(key_node).to_string(),
                        };
                        map.insert(key, literal_to_json(value_node, src)?);
                    }
                    "comment" => {}
                    _ => return None,
                }
            }
            Some(Value::Object(map))
        }
        "unary_operator" => {
            let argument = node.child_by_field_name("argument")?;
            let is_negation = node
                .child_by_field_name("operator")
                .map(|op| src.text(op) == "-")
                .unwrap_or(false);
            if !is_negation {
                return None;
            }
            match literal_to_json(argument, src)? {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Some(Value::from(-i))
                    } else {
                        n.as_f64().and_then(|f| float_value(-f))
                    }
                }
                _ => None,
            }
        }
        "parenthesized_expression" => {
            literal_to_json(node.named_child(0)?, src)
        }
        _ => None,
    }
}

fn float_value(f: f64) -> Option<Value> {
    serde_json::Number::from_f64(f).map(Value::Number)
}

/// The dotted name of an expression made of identifiers and attributes
/// (`json.loads` → `"json.loads"`); `None` for anything else
pub fn dotted_name(node: Node<'_>, src: &PythonSource) -> Option<String> {
    match node.kind() {
        "identifier" => Some(src.text(node).to_string()),
        "attribute" => {
            let object = dotted_name(node.child_by_field_name("object")?, src)?;
            let attr = src.text(node.child_by_field_name("attribute")?);
            Some(format!("{object}.{attr}"))
        }
        _ => None,
    }
}

/// The trailing component of a dotted name (`pydantic.BaseModel` →
/// `BaseModel`)
pub fn base_name(node: Node<'_>, src: &PythonSource) -> Option<String> {
    dotted_name(node, src).map(|name| {
        name.rsplit('.')
            .next()
            .unwrap_or(name.as_str())
            .to_string()
    })
}

/// Literal keyword arguments of a call node, in declaration order
///
/// Non-literal values are skipped; the scanner records only what can be
/// read without running anything.
pub fn literal_keyword_arguments(call: Node<'_>, src: &PythonSource) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return out;
    };
    let mut cursor = arguments.walk();
    for child in arguments.named_children(&mut cursor) {
        if child.kind() != "keyword_argument" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let Some(value_node) = child.child_by_field_name("value") else {
            continue;
        };
        if let Some(value) = literal_to_json(value_node, src) {
            out.push((src.text(name_node).to_string(), value));
        }
    }
    out
}
