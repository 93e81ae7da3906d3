//! Static service discovery
//!
//! Walks the scan roots for Python sources and extracts every callable
//! carrying the service annotation, by parsing the files rather than
//! importing them. Discovery is an explicit return value: the scanner hands
//! back a map of what it found, and nothing here mutates global state.
//!
//! Also home to the type-annotation normalizer and the name-case helpers the
//! analyzer reuses, since both vocabularies originate in scanned signatures.

use crate::ast::{self, PythonSource};
use crate::collector::Collector;
use crate::context::GenerationContext;
use crate::directory_utils::collect_source_files;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Decorator name that marks a callable as a service
pub const SERVICE_DECORATOR: &str = "service";

/// Parameter names for the implicit receiver, never part of a signature
const RECEIVER_NAMES: &[&str] = &["self", "cls"];

/// One parameter of a scanned callable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceParameter {
    /// Parameter name
    pub name: String,
    /// Annotation text as written in the source, empty when unannotated
    pub declared_type: String,
    /// Schema-native base type after normalization
    pub base_type: String,
    /// Custom model name when the annotation references one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    /// Whether the annotation or a `None` default marks this optional
    pub optional: bool,
    /// Whether the signature supplies a default
    pub has_default: bool,
    /// The default when it is a representable literal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Literal keyword arguments of the service annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceAnnotation {
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Grouping category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-form tags
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Ordering priority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Tool name the annotation declares for this callable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Any further literal keyword arguments, kept as-is
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, Value>,
}

/// Structural record of one discovered annotated callable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    /// Callable name
    pub name: String,
    /// `Owner.name` for methods, bare name for functions
    pub qualified_name: String,
    /// Owning class for methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Conventional instance identifier derived from the owner name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Dotted module path relative to the scan root
    pub module: String,
    /// Whether the callable is declared `async`
    pub is_async: bool,
    /// Annotation metadata
    pub annotation: ServiceAnnotation,
    /// Signature parameters, receiver excluded
    pub parameters: Vec<ServiceParameter>,
    /// File the callable was found in
    pub source_path: PathBuf,
    /// 1-based line of the definition
    pub line: usize,
}

impl ServiceDescriptor {
    /// Look up a signature parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ServiceParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Owning-type index entry: where a handler class lives and what its
/// conventional instance is called
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerEntry {
    /// Declaring module
    pub module: String,
    /// Instance identifier
    pub instance: String,
}

/// Everything one scan pass discovered
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// Callable name to descriptor
    pub services: BTreeMap<String, ServiceDescriptor>,
    /// Owning class name to handler entry
    pub handlers: BTreeMap<String, HandlerEntry>,
    /// Per-file problems that did not stop the scan
    pub warnings: Vec<String>,
}

/// Statically scans the source tree for annotated callables
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceScanner;

impl Collector for ServiceScanner {
    type Fragment = ScanOutcome;

    fn name(&self) -> &'static str {
        "service_scanner"
    }

    /// One unparsable file is recorded as a warning and skipped; the scan
    /// itself only fails on empty input configurations it cannot interpret.
    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment> {
        let mut outcome = ScanOutcome::default();
        for file in collect_source_files(ctx) {
            let module = module_for_file(&file, ctx);
            if let Err(err) = scan_file(&file, &module, &mut outcome) {
                let message =
                    format!("skipping unparsable source file {}: {err}", file.display());
                tracing::warn!("{message}");
                outcome.warnings.push(message);
            }
        }
        tracing::debug!(
            "scan found {} services across {} handler types",
            outcome.services.len(),
            outcome.handlers.len()
        );
        Ok(outcome)
    }

    fn collect_minimal(&self, _ctx: &GenerationContext) -> Self::Fragment {
        ScanOutcome::default()
    }

    fn validate(&self, fragment: &Self::Fragment) -> bool {
        let receivers_excluded = fragment.services.values().all(|descriptor| {
            descriptor
                .parameters
                .iter()
                .all(|p| !RECEIVER_NAMES.contains(&p.name.as_str()))
        });
        let keys_consistent = fragment
            .services
            .iter()
            .all(|(key, descriptor)| key == &descriptor.name);
        let handlers_complete = fragment
            .handlers
            .values()
            .all(|entry| !entry.module.is_empty() && !entry.instance.is_empty());
        receivers_excluded && keys_consistent && handlers_complete
    }
}

/// Dotted module path for a scanned file, relative to its scan root
fn module_for_file(file: &Path, ctx: &GenerationContext) -> String {
    for root in ctx.scan_roots() {
        if let Ok(rel) = file.strip_prefix(root) {
            return module_path(rel);
        }
    }
    module_path(file)
}

fn module_path(rel: &Path) -> String {
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }
    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }
    parts.join(".")
}

fn scan_file(path: &Path, module: &str, outcome: &mut ScanOutcome) -> Result<()> {
    let src = PythonSource::parse_file(path)?;
    let root = src.root();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "decorated_definition" => {
                let Some(definition) = node.child_by_field_name("definition") else {
                    continue;
                };
                match definition.kind() {
                    "function_definition" => {
                        collect_callable(node, definition, None, &src, module, path, outcome);
                    }
                    "class_definition" => {
                        collect_class(definition, &src, module, path, outcome);
                    }
                    _ => {}
                }
            }
            "class_definition" => collect_class(node, &src, module, path, outcome),
            _ => {}
        }
    }
    Ok(())
}

fn collect_class(
    class_node: Node<'_>,
    src: &PythonSource,
    module: &str,
    path: &Path,
    outcome: &mut ScanOutcome,
) {
    let Some(name_node) = class_node.child_by_field_name("name") else {
        return;
    };
    let owner = src.text(name_node).to_string();
    let Some(body) = class_node.child_by_field_name("body") else {
        return;
    };
    let mut found_service = false;
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if member.kind() != "decorated_definition" {
            continue;
        }
        let Some(definition) = member.child_by_field_name("definition") else {
            continue;
        };
        if definition.kind() != "function_definition" {
            continue;
        }
        if collect_callable(member, definition, Some(&owner), src, module, path, outcome) {
            found_service = true;
        }
    }
    if found_service {
        outcome.handlers.insert(
            owner.clone(),
            HandlerEntry {
                module: module.to_string(),
                instance: snake_case(&owner),
            },
        );
    }
}

/// Record one decorated callable if it carries the service annotation.
/// Returns whether a service was registered.
fn collect_callable(
    decorated: Node<'_>,
    function: Node<'_>,
    owner: Option<&str>,
    src: &PythonSource,
    module: &str,
    path: &Path,
    outcome: &mut ScanOutcome,
) -> bool {
    let Some(annotation_call) = find_service_decorator(decorated, src) else {
        return false;
    };
    let Some(name_node) = function.child_by_field_name("name") else {
        return false;
    };
    let name = src.text(name_node).to_string();

    let parameters = function
        .child_by_field_name("parameters")
        .map(|params| parameters_from_node(params, src))
        .unwrap_or_default();
    let mut cursor = function.walk();
    let is_async = function.children(&mut cursor).any(|c| c.kind() == "async");

    let descriptor = ServiceDescriptor {
        qualified_name: match owner {
            Some(owner) => format!("{owner}.{name}"),
            None => name.clone(),
        },
        owner: owner.map(String::from),
        instance: owner.map(snake_case),
        module: module.to_string(),
        is_async,
        annotation: annotation_from_call(annotation_call, src),
        parameters,
        source_path: path.to_path_buf(),
        line: function.start_position().row + 1,
        name: name.clone(),
    };

    if outcome.services.insert(name.clone(), descriptor).is_some() {
        let message = format!(
            "duplicate service name '{name}' redefined in {}",
            path.display()
        );
        tracing::warn!("{message}");
        outcome.warnings.push(message);
    }
    true
}

/// The service decorator on a decorated definition, if present
///
/// Outer `Some` means the decorator was found; the inner option carries the
/// call node when the decorator takes arguments (`@service(...)` as opposed
/// to bare `@service`).
fn find_service_decorator<'t>(
    decorated: Node<'t>,
    src: &PythonSource,
) -> Option<Option<Node<'t>>> {
    let mut cursor = decorated.walk();
    for child in decorated.children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let Some(expr) = child.named_child(0) else {
            continue;
        };
        match expr.kind() {
            "identifier" | "attribute" => {
                if ast::base_name(expr, src).as_deref() == Some(SERVICE_DECORATOR) {
                    return Some(None);
                }
            }
            "call" => {
                let Some(function) = expr.child_by_field_name("function") else {
                    continue;
                };
                if ast::base_name(function, src).as_deref() == Some(SERVICE_DECORATOR) {
                    return Some(Some(expr));
                }
            }
            _ => {}
        }
    }
    None
}

fn annotation_from_call(call: Option<Node<'_>>, src: &PythonSource) -> ServiceAnnotation {
    let mut annotation = ServiceAnnotation::default();
    let Some(call) = call else {
        return annotation;
    };
    for (key, value) in ast::literal_keyword_arguments(call, src) {
        match key.as_str() {
            "description" => annotation.description = value.as_str().map(String::from),
            "category" => annotation.category = value.as_str().map(String::from),
            "tags" => {
                annotation.tags = value
                    .as_array()
                    .map(|tags| {
                        tags.iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
            }
            "priority" => annotation.priority = value.as_i64(),
            "name" | "tool_name" => annotation.tool_name = value.as_str().map(String::from),
            _ => {
                annotation.extra.insert(key, value);
            }
        }
    }
    annotation
}

fn parameters_from_node(params: Node<'_>, src: &PythonSource) -> Vec<ServiceParameter> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        if let Some(parameter) = parameter_from_node(child, src) {
            out.push(parameter);
        }
    }
    out
}

fn parameter_from_node(node: Node<'_>, src: &PythonSource) -> Option<ServiceParameter> {
    match node.kind() {
        "identifier" => build_parameter(src.text(node), None, None, src),
        "typed_parameter" => {
            let name_node = node.named_child(0)?;
            if name_node.kind() != "identifier" {
                return None;
            }
            build_parameter(
                src.text(name_node),
                node.child_by_field_name("type"),
                None,
                src,
            )
        }
        "default_parameter" => {
            let name_node = node.child_by_field_name("name")?;
            build_parameter(
                src.text(name_node),
                None,
                node.child_by_field_name("value"),
                src,
            )
        }
        "typed_default_parameter" => {
            let name_node = node.child_by_field_name("name")?;
            build_parameter(
                src.text(name_node),
                node.child_by_field_name("type"),
                node.child_by_field_name("value"),
                src,
            )
        }
        // splats and bare separators are not schema-representable
        _ => None,
    }
}

fn build_parameter(
    name: &str,
    type_node: Option<Node<'_>>,
    default_node: Option<Node<'_>>,
    src: &PythonSource,
) -> Option<ServiceParameter> {
    if RECEIVER_NAMES.contains(&name) {
        return None;
    }
    let declared_type = type_node
        .map(|n| src.text(n).to_string())
        .unwrap_or_default();
    let normalized = normalize_type(&declared_type);
    let default = default_node.and_then(|n| ast::literal_to_json(n, src));
    let optional = normalized.optional || matches!(default, Some(Value::Null));
    Some(ServiceParameter {
        name: name.to_string(),
        declared_type,
        base_type: normalized.base,
        custom_type: normalized.custom,
        optional,
        has_default: default_node.is_some(),
        default,
    })
}

/// A type annotation reduced to schema vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedType {
    /// Schema-native base type
    pub base: String,
    /// Whether the annotation admits `None`
    pub optional: bool,
    /// Custom model name, when the annotation references one
    pub custom: Option<String>,
}

/// Reduce a Python type annotation to a schema base type
///
/// `Optional[T]` and `Union[T, None]` decompose into the base of `T` plus an
/// optional flag so downstream consumers reason about optionality uniformly.
/// An uppercase-leading identifier that is neither a generic wrapper nor a
/// primitive becomes a custom type with base `object`.
pub fn normalize_type(annotation: &str) -> NormalizedType {
    let text = annotation.trim();
    let text = text.strip_prefix("typing.").unwrap_or(text);
    if text.is_empty() {
        return plain("string");
    }
    if let Some(inner) = bracket_inner(text, "Optional") {
        let mut normalized = normalize_type(inner);
        normalized.optional = true;
        return normalized;
    }
    if let Some(inner) = bracket_inner(text, "Union") {
        let members = split_top_level(inner);
        let optional = members.iter().any(|m| m.trim() == "None");
        let first = members
            .iter()
            .map(|m| m.trim())
            .find(|m| *m != "None")
            .unwrap_or("Any");
        let mut normalized = normalize_type(first);
        normalized.optional = normalized.optional || optional;
        return normalized;
    }
    for wrapper in ["List", "Tuple", "Set", "FrozenSet", "Sequence", "Iterable"] {
        if bracket_inner(text, wrapper).is_some() {
            return plain("array");
        }
    }
    for wrapper in ["Dict", "Mapping", "MutableMapping"] {
        if bracket_inner(text, wrapper).is_some() {
            return plain("object");
        }
    }
    for wrapper in ["list", "tuple", "set", "frozenset"] {
        if bracket_inner(text, wrapper).is_some() {
            return plain("array");
        }
    }
    if bracket_inner(text, "dict").is_some() {
        return plain("object");
    }
    if bracket_inner(text, "Literal").is_some() {
        return plain("string");
    }

    let bare = text.rsplit('.').next().unwrap_or(text);
    match bare {
        "str" | "bytes" | "Literal" => plain("string"),
        "int" => plain("integer"),
        "float" => plain("number"),
        "bool" => plain("boolean"),
        "None" => plain("null"),
        "dict" | "Dict" | "Mapping" | "MutableMapping" | "Any" | "object" | "Optional"
        | "Union" => plain("object"),
        "list" | "List" | "tuple" | "Tuple" | "set" | "Set" | "frozenset" | "FrozenSet"
        | "Sequence" | "Iterable" => plain("array"),
        other if is_custom_identifier(other) => NormalizedType {
            base: "object".to_string(),
            optional: false,
            custom: Some(other.to_string()),
        },
        _ => plain("string"),
    }
}

fn plain(base: &str) -> NormalizedType {
    NormalizedType {
        base: base.to_string(),
        optional: false,
        custom: None,
    }
}

fn is_custom_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Inner text of `wrapper[...]`, when `text` is exactly that shape
fn bracket_inner<'a>(text: &'a str, wrapper: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(wrapper)?;
    rest.strip_prefix('[')?.strip_suffix(']')
}

/// Split on commas outside any bracket nesting
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// CamelCase to snake_case, used for conventional instance names
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_is_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_is_lower = chars
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            if i > 0 && (prev_is_lower || next_is_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// snake_case to CamelCase, used for last-resort model-name inference
pub fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
