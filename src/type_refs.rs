//! Custom type discovery
//!
//! Two sources feed the custom-type list. Designated type-definition files
//! are statically scanned for structured-model classes, and the other
//! collectors' output is harvested for type names their records reference.
//! Schema-native scalars can never enter the list: only names the normalizer
//! classifies as custom are ever inserted.

use crate::ast::{self, PythonSource};
use crate::catalog::ToolRecord;
use crate::collector::Collector;
use crate::context::GenerationContext;
use crate::error::Result;
use crate::internal_args::InternalArgMap;
use crate::scanner::normalize_type;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Base-class names that mark a class as a structured model
pub const BASE_MODEL_NAMES: &[&str] = &["BaseModel", "BaseSettings"];

/// Call name that marks a class attribute as a field declaration
pub const FIELD_BUILDER: &str = "Field";

/// Base-class names that mark a class as an enumeration
const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

/// One discovered or referenced custom type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeReference {
    /// Type name
    pub name: String,
    /// File the declaration was found in, absent for harvested names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_in: Option<PathBuf>,
    /// Whether the declaration is an enumeration
    pub is_enum: bool,
}

/// Scans designated type-definition files for model declarations
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeRefCollector;

impl Collector for TypeRefCollector {
    type Fragment = Vec<TypeReference>;

    fn name(&self) -> &'static str {
        "type_refs"
    }

    /// A missing or unparsable type file is skipped with a warning; the
    /// designated list is advisory, not a hard requirement.
    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment> {
        let mut references = Vec::new();
        for file in &ctx.type_files {
            if !file.exists() {
                tracing::warn!("type file {} does not exist, skipping", file.display());
                continue;
            }
            match scan_type_file(file) {
                Ok(mut found) => references.append(&mut found),
                Err(err) => {
                    tracing::warn!("skipping unparsable type file {}: {err}", file.display());
                }
            }
        }
        references.sort_by(|a, b| a.name.cmp(&b.name));
        references.dedup_by(|a, b| a.name == b.name);
        Ok(references)
    }

    fn collect_minimal(&self, _ctx: &GenerationContext) -> Self::Fragment {
        Vec::new()
    }

    fn validate(&self, fragment: &Self::Fragment) -> bool {
        const SCALARS: &[&str] = &[
            "string", "number", "integer", "boolean", "object", "array", "null",
        ];
        fragment
            .iter()
            .all(|reference| {
                !reference.name.is_empty() && !SCALARS.contains(&reference.name.as_str())
            })
            && fragment.windows(2).all(|pair| pair[0].name <= pair[1].name)
    }
}

fn scan_type_file(path: &Path) -> Result<Vec<TypeReference>> {
    let src = PythonSource::parse_file(path)?;
    let root = src.root();
    let mut found = Vec::new();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        let class_node = match node.kind() {
            "class_definition" => node,
            "decorated_definition" => {
                let Some(definition) = node.child_by_field_name("definition") else {
                    continue;
                };
                if definition.kind() != "class_definition" {
                    continue;
                }
                definition
            }
            _ => continue,
        };
        if let Some(reference) = model_class(class_node, &src, path) {
            found.push(reference);
        }
    }
    Ok(found)
}

/// Classify a class declaration, returning a reference when it is a model
///
/// A model either inherits a recognized base-model (or enum) name or carries
/// field-builder attributes in its body.
fn model_class(class_node: Node<'_>, src: &PythonSource, path: &Path) -> Option<TypeReference> {
    let name = src
        .text(class_node.child_by_field_name("name")?)
        .to_string();
    let mut is_model = false;
    let mut is_enum = false;
    if let Some(superclasses) = class_node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for superclass in superclasses.named_children(&mut cursor) {
            let Some(base) = ast::base_name(superclass, src) else {
                continue;
            };
            if BASE_MODEL_NAMES.contains(&base.as_str()) {
                is_model = true;
            }
            if ENUM_BASES.contains(&base.as_str()) {
                is_model = true;
                is_enum = true;
            }
        }
    }
    if !is_model && has_field_builders(class_node, src) {
        is_model = true;
    }
    is_model.then(|| TypeReference {
        name,
        declared_in: Some(path.to_path_buf()),
        is_enum,
    })
}

fn has_field_builders(class_node: Node<'_>, src: &PythonSource) -> bool {
    let Some(body) = class_node.child_by_field_name("body") else {
        return false;
    };
    let mut cursor = body.walk();
    let found = body.named_children(&mut cursor).any(|member| {
        if member.kind() != "expression_statement" {
            return false;
        }
        let Some(assignment) = member.named_child(0).filter(|n| n.kind() == "assignment")
        else {
            return false;
        };
        let Some(right) = assignment.child_by_field_name("right") else {
            return false;
        };
        if right.kind() != "call" {
            return false;
        }
        right
            .child_by_field_name("function")
            .and_then(|function| ast::base_name(function, src))
            .is_some_and(|name| name == FIELD_BUILDER)
    });
    found
}

/// Harvest custom type names referenced by tool records and internal args
///
/// Scans declared `type` fields and model references. Insertion goes through
/// the normalizer, so scalar and wrapper names are excluded by construction.
pub fn harvest_custom_types(
    tools: &[ToolRecord],
    internal_args: &InternalArgMap,
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for tool in tools {
        for param in &tool.parameters {
            insert_custom(&mut names, &param.param_type);
            if let Some(model) = &param.base_model {
                insert_custom(&mut names, model);
            }
        }
    }
    for args in internal_args.values() {
        for arg in args.values() {
            insert_custom(&mut names, &arg.arg_type);
            let schema_model = arg
                .schema
                .as_ref()
                .and_then(|schema| schema.get("baseModel"))
                .and_then(Value::as_str);
            if let Some(model) = schema_model {
                insert_custom(&mut names, model);
            }
        }
    }
    names
}

fn insert_custom(names: &mut BTreeSet<String>, declared: &str) {
    if let Some(custom) = normalize_type(declared).custom {
        names.insert(custom);
    }
}
