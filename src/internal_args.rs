//! Internal argument defaults
//!
//! Internal arguments are parameter values the generator supplies on behalf
//! of the caller. They never appear in a tool's external schema; the defaults
//! file binds each one to a handler parameter through an explicit
//! `targetParam` name. Binding is never inferred: an entry without a target
//! is surfaced by validation here and aborts analysis later.

use crate::collector::Collector;
use crate::context::GenerationContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Conventional defaults-file locations tried relative to the catalog's
/// directory when the context does not name one
pub const SIBLING_CANDIDATES: &[&str] = &[
    "internal_args.json",
    "internal_args.yaml",
    "config/internal_args.json",
];

/// Where an internal argument's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgProvenance {
    /// Declared in the internal defaults file
    Internal,
    /// Echoed from a scanned signature default during analysis
    SignatureDefault,
}

/// One generator-supplied argument for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalArg {
    /// Tool the argument belongs to
    pub tool: String,
    /// Argument name as written in the defaults file
    pub name: String,
    /// Handler parameter this argument supplies. Mandatory for analysis;
    /// optional here so validation can report its absence by name.
    #[serde(rename = "targetParam", skip_serializing_if = "Option::is_none")]
    pub target_param: Option<String>,
    /// Declared type of the argument
    #[serde(rename = "type", default)]
    pub arg_type: String,
    /// Resolved value, after schema-default back-fill
    #[serde(default)]
    pub value: Value,
    /// Provenance tag
    pub provenance: ArgProvenance,
    /// Nested schema carried for object-valued arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Tool name to argument name to argument, deterministically ordered
pub type InternalArgMap = BTreeMap<String, BTreeMap<String, InternalArg>>;

/// Loads the internal defaults file
#[derive(Debug, Default, Clone, Copy)]
pub struct InternalArgsCollector;

impl Collector for InternalArgsCollector {
    type Fragment = InternalArgMap;

    fn name(&self) -> &'static str {
        "internal_args"
    }

    /// A missing file is a valid state and yields an empty map; only an
    /// unreadable or malformed file is an error.
    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment> {
        let Some(path) = resolve_args_path(ctx) else {
            tracing::debug!("no internal defaults file found, using empty map");
            return Ok(InternalArgMap::new());
        };
        load_internal_args(&path)
    }

    fn collect_minimal(&self, _ctx: &GenerationContext) -> Self::Fragment {
        InternalArgMap::new()
    }

    fn validate(&self, fragment: &Self::Fragment) -> bool {
        fragment.values().flat_map(|args| args.values()).all(|arg| {
            !arg.tool.is_empty()
                && !arg.name.is_empty()
                && arg
                    .target_param
                    .as_deref()
                    .is_some_and(|target| !target.is_empty())
        })
    }
}

/// Resolve the defaults file for a context
///
/// An explicitly configured path wins even if absent (the caller said where
/// to look); otherwise the conventional sibling locations of the catalog are
/// tried in order. Returns `None` when nothing exists on disk.
pub fn resolve_args_path(ctx: &GenerationContext) -> Option<PathBuf> {
    if let Some(path) = &ctx.internal_args_path {
        return path.exists().then(|| path.clone());
    }
    let catalog_dir = ctx.catalog_path.parent()?;
    SIBLING_CANDIDATES
        .iter()
        .map(|candidate| catalog_dir.join(candidate))
        .find(|path| path.exists())
}

/// Load and enrich the defaults mapping from one file
pub fn load_internal_args(path: &Path) -> Result<InternalArgMap> {
    let content = std::fs::read_to_string(path)?;
    let root: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };

    let mut map = InternalArgMap::new();
    let Some(tools) = root.as_object() else {
        return Ok(map);
    };
    for (tool, args) in tools {
        let Some(entries) = args.as_object() else {
            continue;
        };
        let mut parsed = BTreeMap::new();
        for (arg_name, entry) in entries {
            parsed.insert(arg_name.clone(), arg_from_entry(tool, arg_name, entry));
        }
        map.insert(tool.clone(), parsed);
    }
    Ok(map)
}

fn arg_from_entry(tool: &str, name: &str, entry: &Value) -> InternalArg {
    let target_param = entry
        .get("targetParam")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);
    let arg_type = entry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let schema = entry.get("schema").cloned();
    let raw_value = entry.get("value").cloned().unwrap_or(Value::Null);
    let value = effective_value(raw_value, schema.as_ref());
    InternalArg {
        tool: tool.to_string(),
        name: name.to_string(),
        target_param,
        arg_type,
        value,
        provenance: ArgProvenance::Internal,
        schema,
    }
}

/// Back-fill an empty object value from field-level schema defaults
///
/// Lets an author write `"value": {}` and rely on the nested schema's
/// per-field `default`s instead of repeating them.
fn effective_value(raw: Value, schema: Option<&Value>) -> Value {
    let is_empty_object = raw.as_object().is_some_and(|map| map.is_empty());
    if !is_empty_object {
        return raw;
    }
    let Some(properties) = schema
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
    else {
        return raw;
    };
    let mut rebuilt = serde_json::Map::new();
    for (field, prop) in properties {
        if let Some(default) = prop.get("default") {
            rebuilt.insert(field.clone(), default.clone());
        }
    }
    if rebuilt.is_empty() {
        raw
    } else {
        Value::Object(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const ARGS_FILE: &str = r#"{
        "list_mail": {
            "trace_id": {
                "targetParam": "trace_id",
                "type": "string",
                "value": "req-default"
            },
            "page_opts": {
                "targetParam": "paging",
                "type": "object",
                "value": {},
                "schema": {
                    "properties": {
                        "size": {"type": "integer", "default": 25},
                        "cursor": {"type": "string"}
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_load_and_backfill_from_schema_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("internal_args.json");
        fs::write(&path, ARGS_FILE).unwrap();

        let map = load_internal_args(&path).unwrap();
        let args = map.get("list_mail").unwrap();

        let trace = &args["trace_id"];
        assert_eq!(trace.target_param.as_deref(), Some("trace_id"));
        assert_eq!(trace.value, json!("req-default"));
        assert_eq!(trace.provenance, ArgProvenance::Internal);

        // empty object rebuilt from the one field that has a default
        let paging = &args["page_opts"];
        assert_eq!(paging.value, json!({"size": 25}));
    }

    #[test]
    fn test_missing_file_yields_empty_map_without_error() {
        let dir = TempDir::new().unwrap();
        let ctx = GenerationContext::new("t", dir.path().join("catalog.json"))
            .with_internal_args(dir.path().join("absent.json"));
        let collector = InternalArgsCollector;
        let fragment = collector.collect(&ctx).unwrap();
        assert!(fragment.is_empty());
        assert_eq!(fragment, collector.collect_minimal(&ctx));
    }

    #[test]
    fn test_sibling_search_finds_conventional_location() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("catalog.json");
        fs::write(&catalog, "[]").unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config/internal_args.json"),
            r#"{"t": {"a": {"targetParam": "a", "value": 1}}}"#,
        )
        .unwrap();

        let ctx = GenerationContext::new("t", &catalog);
        let resolved = resolve_args_path(&ctx).unwrap();
        assert!(resolved.ends_with("config/internal_args.json"));

        let map = InternalArgsCollector.collect(&ctx).unwrap();
        assert_eq!(map["t"]["a"].value, json!(1));
    }

    #[test]
    fn test_entry_without_target_param_loads_but_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("internal_args.json");
        fs::write(&path, r#"{"t": {"orphan": {"type": "string", "value": "x"}}}"#).unwrap();

        let map = load_internal_args(&path).unwrap();
        assert!(map["t"]["orphan"].target_param.is_none());
        assert!(!InternalArgsCollector.validate(&map));
    }

    #[test]
    fn test_malformed_file_is_a_collect_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("internal_args.json");
        fs::write(&path, "not json").unwrap();
        let ctx =
            GenerationContext::new("t", dir.path().join("catalog.json")).with_internal_args(&path);
        assert!(InternalArgsCollector.collect(&ctx).is_err());
    }
}
