//! Tool catalog loading
//!
//! The catalog is the externally authored list of tools the generated server
//! will expose. It is edited by hand (or through the out-of-scope editing UI)
//! and arrives in one of three forms: a JSON file, a YAML file, or a literal
//! list assigned to a module-level variable inside a Python source file. The
//! Python form is read by walking its syntax tree, never by importing it.

use crate::ast::{self, PythonSource};
use crate::collector::Collector;
use crate::context::GenerationContext;
use crate::error::{Result, ToolsmithError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::Node;

/// Module-level variable holding the tool list in a Python-embedded catalog
pub const CATALOG_VARIABLE: &str = "TOOLS";

/// One declared parameter of a tool's input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name as exposed to external callers
    pub name: String,
    /// Schema type (`string`, `integer`, `number`, `boolean`, `object`,
    /// `array`, `null`, or a custom model name)
    #[serde(rename = "type")]
    pub param_type: String,
    /// Whether callers must supply this parameter
    #[serde(default)]
    pub required: bool,
    /// Default value used when the caller omits the parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Structured model backing an object-typed parameter
    #[serde(
        default,
        rename = "baseModel",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_model: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// One externally authored tool record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Unique tool name within the catalog
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Declared input parameters, normalized from the on-disk schema
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    /// Explicit binding to a scanned service, by callable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl ToolRecord {
    /// Look up a declared parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Loads the tool catalog from its on-disk form
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolCatalogCollector;

impl Collector for ToolCatalogCollector {
    type Fragment = Vec<ToolRecord>;

    fn name(&self) -> &'static str {
        "tool_catalog"
    }

    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment> {
        load_catalog(&ctx.catalog_path)
    }

    /// An empty catalog is a legitimate bootstrap state
    fn collect_minimal(&self, _ctx: &GenerationContext) -> Self::Fragment {
        Vec::new()
    }

    fn validate(&self, fragment: &Self::Fragment) -> bool {
        let mut seen = BTreeSet::new();
        fragment
            .iter()
            .all(|record| !record.name.is_empty() && seen.insert(record.name.as_str()))
    }
}

/// Load tool records from a catalog file, dispatching on extension
///
/// Record order follows the on-disk list; parameter order within a record
/// follows the schema map's deterministic key order.
pub fn load_catalog(path: &Path) -> Result<Vec<ToolRecord>> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let value = match extension {
        "json" => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        "yaml" | "yml" => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        "py" => python_embedded_catalog(path)?,
        other => {
            return Err(ToolsmithError::Catalog(format!(
                "unsupported catalog format '{other}' for {}",
                path.display()
            )))
        }
    };
    records_from_value(&value, path)
}

/// Extract the catalog literal from a `TOOLS = ...` assignment
fn python_embedded_catalog(path: &Path) -> Result<Value> {
    let src = PythonSource::parse_file(path)?;
    let root = src.root();
    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = statement
            .named_child(0)
            .filter(|n| n.kind() == "assignment")
        else {
            continue;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        if left.kind() != "identifier" || src.text(left) != CATALOG_VARIABLE {
            continue;
        }
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        return catalog_value_from_node(right, &src, path);
    }
    Err(ToolsmithError::Catalog(format!(
        "no `{CATALOG_VARIABLE} = ...` assignment found in {}",
        path.display()
    )))
}

/// Decode the assignment's right-hand side
///
/// Either a plain list/dict literal, or a call wrapping a single serialized
/// string (`parse("[...]")` style) whose argument is decoded as JSON.
fn catalog_value_from_node(node: Node<'_>, src: &PythonSource, path: &Path) -> Result<Value> {
    if let Some(value) = ast::literal_to_json(node, src) {
        return Ok(value);
    }
    if node.kind() == "call" {
        if let Some(arguments) = node.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            let strings: Vec<Node<'_>> = arguments
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "string")
                .collect();
            if let [serialized] = strings.as_slice() {
                if let Some(text) = ast::string_literal(*serialized, src) {
                    return Ok(serde_json::from_str(&text)?);
                }
            }
        }
    }
    Err(ToolsmithError::Catalog(format!(
        "`{CATALOG_VARIABLE}` in {} is neither a literal nor a call-wrapped serialized literal",
        path.display()
    )))
}

/// Accept either a root object with a `tools` array or a bare array
fn records_from_value(value: &Value, path: &Path) -> Result<Vec<ToolRecord>> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ToolsmithError::Catalog(format!(
                    "catalog object in {} has no 'tools' array",
                    path.display()
                ))
            })?,
        _ => {
            return Err(ToolsmithError::Catalog(format!(
                "catalog root in {} is neither an array nor an object",
                path.display()
            )))
        }
    };
    list.iter().map(record_from_value).collect()
}

fn record_from_value(value: &Value) -> Result<ToolRecord> {
    let record = value
        .as_object()
        .ok_or_else(|| ToolsmithError::Catalog("tool record is not an object".to_string()))?;
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ToolsmithError::Catalog("tool record is missing 'name'".to_string()))?
        .to_string();
    let description = record
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let service = record
        .get("service")
        .and_then(Value::as_str)
        .map(String::from);
    let parameters = record
        .get("inputSchema")
        .map(parameters_from_schema)
        .unwrap_or_default();
    Ok(ToolRecord {
        name,
        description,
        parameters,
        service,
    })
}

/// Normalize either input-schema shape to a parameter list
///
/// MCP style is keyed by `type == "object"` and nests parameters under
/// `properties` with a sibling `required` array; `properties` may be absent
/// for a tool taking no parameters. The flat style maps each parameter name
/// directly to its attributes with a per-entry `required` flag.
fn parameters_from_schema(schema: &Value) -> Vec<ToolParameter> {
    let Some(map) = schema.as_object() else {
        return Vec::new();
    };
    if map.get("type").and_then(Value::as_str) == Some("object") {
        let Some(properties) = map.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        let required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        return properties
            .iter()
            .map(|(name, entry)| {
                parameter_from_entry(name, entry, required.contains(&name.as_str()))
            })
            .collect();
    }
    map.iter()
        .map(|(name, entry)| parameter_from_entry(name, entry, false))
        .collect()
}

fn parameter_from_entry(name: &str, entry: &Value, required_by_list: bool) -> ToolParameter {
    ToolParameter {
        name: name.to_string(),
        param_type: entry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("string")
            .to_string(),
        required: required_by_list
            || entry
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        default: entry.get("default").cloned(),
        base_model: entry
            .get("baseModel")
            .and_then(Value::as_str)
            .map(String::from),
        description: entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_catalog(dir: &TempDir, file_name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    const JSON_CATALOG: &str = r#"{
        "tools": [
            {
                "name": "list_mail",
                "description": "List messages in a folder",
                "service": "fetch_filter",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "filter_params": {"type": "object", "baseModel": "FilterParams"},
                        "top": {"type": "integer", "default": 50}
                    },
                    "required": ["filter_params"]
                }
            },
            {
                "name": "upload_file",
                "description": "Upload a file to drive",
                "inputSchema": {
                    "path": {"type": "string", "required": true},
                    "overwrite": {"type": "boolean", "required": false, "default": false}
                }
            }
        ]
    }"#;

    #[test]
    fn test_load_json_catalog_with_both_schema_shapes() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "catalog.json", JSON_CATALOG);

        let records = load_catalog(&path).unwrap();
        assert_eq!(records.len(), 2);

        let list_mail = &records[0];
        assert_eq!(list_mail.name, "list_mail");
        assert_eq!(list_mail.service.as_deref(), Some("fetch_filter"));
        let filter = list_mail.parameter("filter_params").unwrap();
        assert_eq!(filter.param_type, "object");
        assert_eq!(filter.base_model.as_deref(), Some("FilterParams"));
        assert!(filter.required);
        let top = list_mail.parameter("top").unwrap();
        assert_eq!(top.param_type, "integer");
        assert_eq!(top.default, Some(json!(50)));
        assert!(!top.required);

        let upload = &records[1];
        assert!(upload.parameter("path").unwrap().required);
        assert_eq!(
            upload.parameter("overwrite").unwrap().default,
            Some(json!(false))
        );
    }

    #[test]
    fn test_object_schema_without_properties_has_no_parameters() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            "catalog.json",
            r#"[
                {"name": "ping", "inputSchema": {"type": "object"}},
                {"name": "sync", "inputSchema": {"type": "object", "required": []}}
            ]"#,
        );
        let records = load_catalog(&path).unwrap();
        assert!(records[0].parameters.is_empty());
        assert!(records[1].parameters.is_empty());
    }

    #[test]
    fn test_load_bare_array_catalog() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            "catalog.json",
            r#"[{"name": "get_event", "inputSchema": {"id": {"type": "string"}}}]"#,
        );
        let records = load_catalog(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "get_event");
    }

    #[test]
    fn test_load_yaml_catalog() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            "catalog.yaml",
            concat!(
                "tools:\n",
                "  - name: list_drive\n",
                "    description: List drive entries\n",
                "    inputSchema:\n",
                "      folder:\n",
                "        type: string\n",
                "        required: true\n",
            ),
        );
        let records = load_catalog(&path).unwrap();
        assert_eq!(records[0].name, "list_drive");
        assert!(records[0].parameter("folder").unwrap().required);
    }

    #[test]
    fn test_load_python_literal_catalog() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            "catalog.py",
            concat!(
                "\"\"\"Hand-maintained tool list.\"\"\"\n",
                "\n",
                "TOOLS = [\n",
                "    {\n",
                "        'name': 'list_mail',\n",
                "        'description': 'List messages',\n",
                "        'inputSchema': {'top': {'type': 'integer', 'default': 50}},\n",
                "    },\n",
                "]\n",
            ),
        );
        let records = load_catalog(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].parameter("top").unwrap().default,
            Some(json!(50))
        );
    }

    #[test]
    fn test_load_python_call_wrapped_catalog() {
        let dir = TempDir::new().unwrap();
        let serialized = r#"[{\"name\": \"send_mail\", \"inputSchema\": {}}]"#;
        let path = write_catalog(
            &dir,
            "catalog.py",
            &format!("TOOLS = json.loads(\"{serialized}\")\n"),
        );
        let records = load_catalog(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "send_mail");
    }

    #[test]
    fn test_missing_file_degrades_to_empty_fragment() {
        let dir = TempDir::new().unwrap();
        let ctx = GenerationContext::new("t", dir.path().join("absent.json"));
        let collector = ToolCatalogCollector;
        assert!(collector.collect(&ctx).is_err());
        assert!(collector.collect_with_fallback(&ctx).is_empty());
    }

    #[test]
    fn test_record_without_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "catalog.json", r#"[{"description": "nameless"}]"#);
        assert!(load_catalog(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let collector = ToolCatalogCollector;
        let record = ToolRecord {
            name: "dup".to_string(),
            description: String::new(),
            parameters: Vec::new(),
            service: None,
        };
        assert!(!collector.validate(&vec![record.clone(), record]));
    }
}
