//! Tool analysis
//!
//! The composition step. Each externally authored tool record is
//! cross-referenced against the scanned services, the internal defaults, and
//! the schema it declares, producing a fully bound record the renderer can
//! emit call sites from. Handler resolution prefers explicit bindings and
//! falls back through the known-override table and keyword routing, never
//! silently: every routed binding is logged and recorded as a warning.

use crate::catalog::{ToolCatalogCollector, ToolParameter, ToolRecord};
use crate::collector::Collector;
use crate::context::{CollectionMode, GenerationContext};
use crate::error::{Result, ToolsmithError};
use crate::internal_args::{ArgProvenance, InternalArg, InternalArgMap, InternalArgsCollector};
use crate::scanner::{
    camel_case, normalize_type, snake_case, ScanOutcome, ServiceDescriptor, ServiceScanner,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Forced bindings for historically irregular tools
///
/// Entries are `(tool name, owning type, method)`. This table is deliberate
/// special-casing kept as explicit data; additions belong here, not in the
/// routing keywords.
pub const KNOWN_BINDING_OVERRIDES: &[(&str, &str, &str)] = &[
    ("reply_mail", "MailService", "send_reply"),
    ("move_mail_to_folder", "MailService", "move_mail"),
    ("export_document", "DriveService", "export_document_content"),
];

/// Keyword routing fallback for tools with no explicit binding
///
/// First match wins. The matching behavior is relied upon by existing
/// catalogs and is kept as-is; a routed binding is always logged.
pub const ROUTING_KEYWORDS: &[(&str, &str)] = &[
    ("mail", "MailService"),
    ("message", "MailService"),
    ("folder", "MailService"),
    ("attachment", "MailService"),
    ("drive", "DriveService"),
    ("file", "DriveService"),
    ("document", "DriveService"),
];

/// Owner used when no routing keyword matches at all
pub const DEFAULT_BINDING_OWNER: &str = "MailService";

/// How a categorized parameter is passed to the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Pass-through value
    Scalar,
    /// Pass-through list
    Array,
    /// Instantiated from a named structured type before the call
    Object,
}

/// Resolved handler for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerBinding {
    /// Owning type name
    pub owner: String,
    /// Conventional instance identifier
    pub instance: String,
    /// Declaring module
    pub module: String,
    /// Method invoked on the instance
    pub method: String,
}

/// One categorized parameter of an analyzed tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedParameter {
    /// Parameter name
    pub name: String,
    /// Pass-through category
    pub kind: ParamKind,
    /// Structured type to instantiate, for object parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Effective default, schema first then scanned signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the external schema requires the parameter
    pub required: bool,
    /// Whether the scanned signature admits `None`
    pub optional: bool,
}

/// Where a call-expression argument comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    /// Supplied by the external caller through the schema
    Schema,
    /// Supplied by the generator from the internal defaults
    Internal,
    /// Supplied by the scanned signature's own default
    SignatureDefault,
}

/// One argument of the generated call expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallBinding {
    /// Handler parameter being supplied
    pub param: String,
    /// Value source
    pub source: CallSource,
    /// Literal value for generator-supplied sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Final, renderer-ready resolution of one tool record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedTool {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Resolved handler
    pub binding: HandlerBinding,
    /// Categorized schema parameters, declaration order
    pub params: Vec<AnalyzedParameter>,
    /// Call-expression arguments: signature order, then schema-only, then
    /// internal-only
    pub call_bindings: Vec<CallBinding>,
    /// Echoed internal arguments, including signature-default echoes
    pub internal_args: BTreeMap<String, InternalArg>,
}

/// Everything one analysis pass produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    /// Analyzed tools, catalog order
    pub tools: Vec<AnalyzedTool>,
    /// Advisory problems found while resolving bindings
    pub warnings: Vec<String>,
}

/// Cross-references tool records into renderer-ready resolutions
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolAnalyzer;

impl ToolAnalyzer {
    /// Analyze every record against the scan and the internal defaults
    ///
    /// Fails fast on the two non-recoverable classes: an explicit binding
    /// that does not resolve, and an internal argument without a target
    /// parameter. Everything else degrades to a warning.
    pub fn analyze(
        &self,
        tools: &[ToolRecord],
        scan: &ScanOutcome,
        internal_args: &InternalArgMap,
    ) -> Result<AnalysisOutcome> {
        let mut outcome = AnalysisOutcome::default();
        for record in tools {
            let analyzed = self.analyze_tool(record, scan, internal_args, &mut outcome.warnings)?;
            outcome.tools.push(analyzed);
        }
        Ok(outcome)
    }

    fn analyze_tool(
        &self,
        record: &ToolRecord,
        scan: &ScanOutcome,
        internal_args: &InternalArgMap,
        warnings: &mut Vec<String>,
    ) -> Result<AnalyzedTool> {
        let (binding, descriptor) = resolve_binding(record, scan, warnings)?;

        let mut echoed_args: BTreeMap<String, InternalArg> = BTreeMap::new();
        if let Some(declared) = internal_args.get(&record.name) {
            for (arg_name, arg) in declared {
                if arg.target_param.is_none() {
                    return Err(ToolsmithError::UnboundInternalArgument {
                        tool: record.name.clone(),
                        argument: arg_name.clone(),
                    });
                }
                echoed_args.insert(arg_name.clone(), arg.clone());
            }
        }

        let params = record
            .parameters
            .iter()
            .map(|param| categorize_parameter(record, param, descriptor))
            .collect();

        let (call_bindings, signature_defaults) =
            build_call_bindings(record, descriptor, &echoed_args, warnings);
        for echo in signature_defaults {
            echoed_args.entry(echo.name.clone()).or_insert(echo);
        }

        Ok(AnalyzedTool {
            name: record.name.clone(),
            description: record.description.clone(),
            binding,
            params,
            call_bindings,
            internal_args: echoed_args,
        })
    }
}

impl Collector for ToolAnalyzer {
    type Fragment = AnalysisOutcome;

    fn name(&self) -> &'static str {
        "tool_analyzer"
    }

    /// Standalone collection runs the prerequisite collectors itself. The
    /// registry calls [`ToolAnalyzer::analyze`] directly to share fragments.
    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment> {
        let tools = ToolCatalogCollector.collect_with_fallback(ctx);
        let internal_args = InternalArgsCollector.collect_with_fallback(ctx);
        let scan = match ctx.mode {
            CollectionMode::Full => ServiceScanner.collect_with_fallback(ctx),
            CollectionMode::CatalogOnly => ServiceScanner.collect_minimal(ctx),
        };
        self.analyze(&tools, &scan, &internal_args)
    }

    fn collect_minimal(&self, _ctx: &GenerationContext) -> Self::Fragment {
        AnalysisOutcome::default()
    }

    fn validate(&self, fragment: &Self::Fragment) -> bool {
        let mut seen = BTreeSet::new();
        fragment.tools.iter().all(|tool| {
            seen.insert(tool.name.as_str())
                && !tool.binding.owner.is_empty()
                && !tool.binding.method.is_empty()
                && tool
                    .params
                    .iter()
                    .all(|p| p.kind != ParamKind::Object || p.class_name.is_some())
        })
    }
}

/// Resolve the handler for one record
///
/// Order: explicit binding (must resolve), known-override table, a scanned
/// annotation declaring this tool's name, keyword routing, default owner.
fn resolve_binding<'s>(
    record: &ToolRecord,
    scan: &'s ScanOutcome,
    warnings: &mut Vec<String>,
) -> Result<(HandlerBinding, Option<&'s ServiceDescriptor>)> {
    if let Some(service) = &record.service {
        let Some(descriptor) = scan.services.get(service) else {
            return Err(ToolsmithError::UnknownService {
                tool: record.name.clone(),
                service: service.clone(),
            });
        };
        return Ok((binding_from_descriptor(descriptor), Some(descriptor)));
    }

    if let Some((_, owner, method)) = KNOWN_BINDING_OVERRIDES
        .iter()
        .find(|(tool, _, _)| *tool == record.name)
    {
        tracing::debug!("tool '{}' bound through the known-override table", record.name);
        let descriptor = scan
            .services
            .get(*method)
            .filter(|d| d.owner.as_deref() == Some(*owner));
        let binding = match descriptor {
            Some(descriptor) => binding_from_descriptor(descriptor),
            None => synthesized_binding(owner, method, scan),
        };
        return Ok((binding, descriptor));
    }

    if let Some(descriptor) = scan
        .services
        .values()
        .find(|d| d.annotation.tool_name.as_deref() == Some(record.name.as_str()))
    {
        return Ok((binding_from_descriptor(descriptor), Some(descriptor)));
    }

    let lowered = record.name.to_lowercase();
    for (keyword, owner) in ROUTING_KEYWORDS {
        if lowered.contains(keyword) {
            let message = format!(
                "tool '{}' has no explicit binding, routed to {owner} by keyword '{keyword}'",
                record.name
            );
            tracing::warn!("{message}");
            warnings.push(message);
            return Ok((synthesized_binding(owner, &record.name, scan), None));
        }
    }

    let message = format!(
        "tool '{}' matched no routing keyword, falling back to {DEFAULT_BINDING_OWNER}",
        record.name
    );
    tracing::warn!("{message}");
    warnings.push(message);
    Ok((
        synthesized_binding(DEFAULT_BINDING_OWNER, &record.name, scan),
        None,
    ))
}

fn binding_from_descriptor(descriptor: &ServiceDescriptor) -> HandlerBinding {
    match (&descriptor.owner, &descriptor.instance) {
        (Some(owner), Some(instance)) => HandlerBinding {
            owner: owner.clone(),
            instance: instance.clone(),
            module: descriptor.module.clone(),
            method: descriptor.name.clone(),
        },
        // top-level function: conventional owner derived from the module tail
        _ => {
            let tail = descriptor
                .module
                .rsplit('.')
                .next()
                .unwrap_or(descriptor.module.as_str());
            HandlerBinding {
                owner: camel_case(tail),
                instance: tail.to_string(),
                module: descriptor.module.clone(),
                method: descriptor.name.clone(),
            }
        }
    }
}

/// Binding for an owner the scan may or may not have seen
fn synthesized_binding(owner: &str, method: &str, scan: &ScanOutcome) -> HandlerBinding {
    match scan.handlers.get(owner) {
        Some(entry) => HandlerBinding {
            owner: owner.to_string(),
            instance: entry.instance.clone(),
            module: entry.module.clone(),
            method: method.to_string(),
        },
        None => HandlerBinding {
            owner: owner.to_string(),
            instance: snake_case(owner),
            module: snake_case(owner),
            method: method.to_string(),
        },
    }
}

/// Categorize one schema parameter
///
/// Object classification is driven by the record's own schema; the scanned
/// custom type and the parameter name are fallbacks, in that order.
fn categorize_parameter(
    record: &ToolRecord,
    param: &ToolParameter,
    descriptor: Option<&ServiceDescriptor>,
) -> AnalyzedParameter {
    let scanned = descriptor.and_then(|d| d.parameter(&param.name));
    let mut class_name = None;
    let kind = if param.param_type == "array" {
        ParamKind::Array
    } else if param.param_type == "object" {
        class_name = param
            .base_model
            .clone()
            .or_else(|| scanned.and_then(|s| s.custom_type.clone()))
            .or_else(|| {
                tracing::debug!(
                    "inferring model name for parameter '{}' of tool '{}' from its name",
                    param.name,
                    record.name
                );
                Some(camel_case(&param.name))
            });
        ParamKind::Object
    } else if let Some(custom) = normalize_type(&param.param_type).custom {
        class_name = Some(custom);
        ParamKind::Object
    } else {
        ParamKind::Scalar
    };

    let default = param
        .default
        .clone()
        .or_else(|| scanned.and_then(|s| s.default.clone()));
    let optional = scanned.map(|s| s.optional).unwrap_or(!param.required);
    AnalyzedParameter {
        name: param.name.clone(),
        kind,
        class_name,
        default,
        required: param.required,
        optional,
    }
}

/// Assemble the call-expression bindings for one tool
///
/// Signature-backed parameters come first in signature order, each resolved
/// schema-first so internal values never override caller-supplied ones. Then
/// schema-only parameters, then internal-only arguments. Signature defaults
/// used to fill otherwise-unsourced parameters are returned for echoing.
fn build_call_bindings(
    record: &ToolRecord,
    descriptor: Option<&ServiceDescriptor>,
    internal: &BTreeMap<String, InternalArg>,
    warnings: &mut Vec<String>,
) -> (Vec<CallBinding>, Vec<InternalArg>) {
    let mut bindings = Vec::new();
    let mut signature_defaults = Vec::new();
    let mut bound: BTreeSet<String> = BTreeSet::new();

    let mut by_target: BTreeMap<&str, &InternalArg> = BTreeMap::new();
    for arg in internal.values() {
        let Some(target) = arg.target_param.as_deref() else {
            continue;
        };
        if by_target.contains_key(target) {
            warnings.push(format!(
                "multiple internal arguments of tool '{}' target parameter '{target}'",
                record.name
            ));
            continue;
        }
        by_target.insert(target, arg);
    }

    if let Some(descriptor) = descriptor {
        for param in &descriptor.parameters {
            if record.parameter(&param.name).is_some() {
                bindings.push(CallBinding {
                    param: param.name.clone(),
                    source: CallSource::Schema,
                    value: None,
                });
            } else if let Some(arg) = by_target.get(param.name.as_str()) {
                bindings.push(CallBinding {
                    param: param.name.clone(),
                    source: CallSource::Internal,
                    value: Some(arg.value.clone()),
                });
            } else if param.has_default {
                bindings.push(CallBinding {
                    param: param.name.clone(),
                    source: CallSource::SignatureDefault,
                    value: param.default.clone(),
                });
                signature_defaults.push(InternalArg {
                    tool: record.name.clone(),
                    name: param.name.clone(),
                    target_param: Some(param.name.clone()),
                    arg_type: param.base_type.clone(),
                    value: param.default.clone().unwrap_or(Value::Null),
                    provenance: ArgProvenance::SignatureDefault,
                    schema: None,
                });
            } else {
                warnings.push(format!(
                    "parameter '{}' of service '{}' has no source in tool '{}'",
                    param.name, descriptor.name, record.name
                ));
            }
            bound.insert(param.name.clone());
        }
    }

    for param in &record.parameters {
        if !bound.insert(param.name.clone()) {
            continue;
        }
        bindings.push(CallBinding {
            param: param.name.clone(),
            source: CallSource::Schema,
            value: None,
        });
    }

    for (target, arg) in &by_target {
        if !bound.insert((*target).to_string()) {
            continue;
        }
        bindings.push(CallBinding {
            param: (*target).to_string(),
            source: CallSource::Internal,
            value: Some(arg.value.clone()),
        });
    }

    (bindings, signature_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{HandlerEntry, ServiceAnnotation, ServiceParameter};
    use serde_json::json;
    use std::path::PathBuf;

    fn param(
        name: &str,
        param_type: &str,
        required: bool,
        default: Option<Value>,
        base_model: Option<&str>,
    ) -> ToolParameter {
        ToolParameter {
            name: name.to_string(),
            param_type: param_type.to_string(),
            required,
            default,
            base_model: base_model.map(String::from),
            description: String::new(),
        }
    }

    fn record(name: &str, service: Option<&str>, parameters: Vec<ToolParameter>) -> ToolRecord {
        ToolRecord {
            name: name.to_string(),
            description: format!("{name} description"),
            parameters,
            service: service.map(String::from),
        }
    }

    fn sparam(name: &str, declared_type: &str, default: Option<Value>) -> ServiceParameter {
        let normalized = normalize_type(declared_type);
        ServiceParameter {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            base_type: normalized.base,
            custom_type: normalized.custom,
            optional: normalized.optional || matches!(default, Some(Value::Null)),
            has_default: default.is_some(),
            default,
        }
    }

    fn descriptor(
        owner: Option<&str>,
        name: &str,
        module: &str,
        parameters: Vec<ServiceParameter>,
    ) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.to_string(),
            qualified_name: match owner {
                Some(owner) => format!("{owner}.{name}"),
                None => name.to_string(),
            },
            owner: owner.map(String::from),
            instance: owner.map(snake_case),
            module: module.to_string(),
            is_async: true,
            annotation: ServiceAnnotation::default(),
            parameters,
            source_path: PathBuf::from(format!("{module}.py")),
            line: 1,
        }
    }

    fn mail_scan() -> ScanOutcome {
        let mut scan = ScanOutcome::default();
        let fetch = descriptor(
            Some("MailService"),
            "fetch_filter",
            "services.mail",
            vec![
                sparam("filter_params", "Optional[FilterParams]", Some(json!(null))),
                sparam("top", "int", Some(json!(50))),
            ],
        );
        scan.handlers.insert(
            "MailService".to_string(),
            HandlerEntry {
                module: "services.mail".to_string(),
                instance: "mail_service".to_string(),
            },
        );
        scan.services.insert("fetch_filter".to_string(), fetch);
        scan
    }

    fn internal_arg(tool: &str, name: &str, target: Option<&str>, value: Value) -> InternalArg {
        InternalArg {
            tool: tool.to_string(),
            name: name.to_string(),
            target_param: target.map(String::from),
            arg_type: "string".to_string(),
            value,
            provenance: ArgProvenance::Internal,
            schema: None,
        }
    }

    fn args_for(tool: &str, args: Vec<InternalArg>) -> InternalArgMap {
        let mut map = InternalArgMap::new();
        let mut entries = BTreeMap::new();
        for arg in args {
            entries.insert(arg.name.clone(), arg);
        }
        map.insert(tool.to_string(), entries);
        map
    }

    #[test]
    fn test_list_mail_scenario_produces_bound_object_and_scalar() {
        let tools = vec![record(
            "list_mail",
            Some("fetch_filter"),
            vec![
                param("filter_params", "object", true, None, Some("FilterParams")),
                param("top", "integer", false, Some(json!(50)), None),
            ],
        )];
        let outcome = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap();
        let tool = &outcome.tools[0];

        assert_eq!(tool.binding.owner, "MailService");
        assert_eq!(tool.binding.instance, "mail_service");
        assert_eq!(tool.binding.module, "services.mail");
        assert_eq!(tool.binding.method, "fetch_filter");

        let filter = tool.params.iter().find(|p| p.name == "filter_params").unwrap();
        assert_eq!(filter.kind, ParamKind::Object);
        assert_eq!(filter.class_name.as_deref(), Some("FilterParams"));

        let top = tool.params.iter().find(|p| p.name == "top").unwrap();
        assert_eq!(top.kind, ParamKind::Scalar);
        assert_eq!(top.default, Some(json!(50)));

        // both parameters are schema-sourced, in signature order
        assert_eq!(
            tool.call_bindings
                .iter()
                .map(|b| (b.param.as_str(), b.source))
                .collect::<Vec<_>>(),
            vec![
                ("filter_params", CallSource::Schema),
                ("top", CallSource::Schema)
            ]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unknown_explicit_service_fails_fast() {
        let tools = vec![record("list_mail", Some("missing_service"), Vec::new())];
        let err = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap_err();
        match err {
            ToolsmithError::UnknownService { tool, service } => {
                assert_eq!(tool, "list_mail");
                assert_eq!(service, "missing_service");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_internal_arg_without_target_aborts_with_names() {
        let tools = vec![record("list_mail", Some("fetch_filter"), Vec::new())];
        let args = args_for(
            "list_mail",
            vec![internal_arg("list_mail", "orphan", None, json!("x"))],
        );
        let err = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &args)
            .unwrap_err();
        match err {
            ToolsmithError::UnboundInternalArgument { tool, argument } => {
                assert_eq!(tool, "list_mail");
                assert_eq!(argument, "orphan");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trace_id_internal_arg_merges_as_non_schema_value() {
        let tools = vec![record(
            "list_mail",
            Some("fetch_filter"),
            vec![
                param("filter_params", "object", true, None, Some("FilterParams")),
                param("top", "integer", false, Some(json!(50)), None),
            ],
        )];
        let args = args_for(
            "list_mail",
            vec![internal_arg(
                "list_mail",
                "trace_id",
                Some("trace_id"),
                json!("req-default"),
            )],
        );
        let outcome = ToolAnalyzer.analyze(&tools, &mail_scan(), &args).unwrap();
        let tool = &outcome.tools[0];

        assert!(tool.internal_args.contains_key("trace_id"));
        let trace = tool
            .call_bindings
            .iter()
            .find(|b| b.param == "trace_id")
            .unwrap();
        assert_eq!(trace.source, CallSource::Internal);
        assert_eq!(trace.value, Some(json!("req-default")));
        // schema params still precede the internal-only argument
        assert_eq!(tool.call_bindings.last().unwrap().param, "trace_id");
    }

    #[test]
    fn test_internal_arg_never_overrides_schema_satisfied_param() {
        let tools = vec![record(
            "list_mail",
            Some("fetch_filter"),
            vec![param("top", "integer", false, Some(json!(50)), None)],
        )];
        let args = args_for(
            "list_mail",
            vec![internal_arg("list_mail", "top", Some("top"), json!(10))],
        );
        let outcome = ToolAnalyzer.analyze(&tools, &mail_scan(), &args).unwrap();
        let tool = &outcome.tools[0];

        let top_bindings: Vec<&CallBinding> = tool
            .call_bindings
            .iter()
            .filter(|b| b.param == "top")
            .collect();
        assert_eq!(top_bindings.len(), 1);
        assert_eq!(top_bindings[0].source, CallSource::Schema);
        // still echoed for traceability
        assert!(tool.internal_args.contains_key("top"));
    }

    #[test]
    fn test_signature_default_fills_unsourced_param_and_is_echoed() {
        // schema omits `top`, so the signature default supplies it
        let tools = vec![record(
            "list_mail",
            Some("fetch_filter"),
            vec![param("filter_params", "object", true, None, Some("FilterParams"))],
        )];
        let outcome = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap();
        let tool = &outcome.tools[0];

        let top = tool
            .call_bindings
            .iter()
            .find(|b| b.param == "top")
            .unwrap();
        assert_eq!(top.source, CallSource::SignatureDefault);
        assert_eq!(top.value, Some(json!(50)));

        let echoed = &tool.internal_args["top"];
        assert_eq!(echoed.provenance, ArgProvenance::SignatureDefault);
        assert_eq!(echoed.value, json!(50));
        assert_eq!(echoed.arg_type, "integer");
    }

    #[test]
    fn test_declared_tool_name_binds_without_explicit_reference() {
        let mut scan = mail_scan();
        if let Some(fetch) = scan.services.get_mut("fetch_filter") {
            fetch.annotation = ServiceAnnotation {
                tool_name: Some("list_mail".to_string()),
                ..ServiceAnnotation::default()
            };
        }
        let tools = vec![record("list_mail", None, Vec::new())];
        let outcome = ToolAnalyzer
            .analyze(&tools, &scan, &InternalArgMap::new())
            .unwrap();
        assert_eq!(outcome.tools[0].binding.method, "fetch_filter");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_keyword_routing_is_logged_as_warning() {
        let tools = vec![record("archive_mail_batch", None, Vec::new())];
        let outcome = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap();
        let tool = &outcome.tools[0];
        assert_eq!(tool.binding.owner, "MailService");
        assert_eq!(tool.binding.instance, "mail_service");
        assert_eq!(tool.binding.module, "services.mail");
        assert_eq!(tool.binding.method, "archive_mail_batch");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("keyword 'mail'"));
    }

    #[test]
    fn test_unmatched_tool_falls_back_to_default_owner() {
        let tools = vec![record("sync_calendar", None, Vec::new())];
        let outcome = ToolAnalyzer
            .analyze(&tools, &ScanOutcome::default(), &InternalArgMap::new())
            .unwrap();
        assert_eq!(outcome.tools[0].binding.owner, DEFAULT_BINDING_OWNER);
        assert_eq!(outcome.tools[0].binding.instance, "mail_service");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("no routing keyword"));
    }

    #[test]
    fn test_known_override_table_wins_over_routing() {
        let tools = vec![record("reply_mail", None, Vec::new())];
        let outcome = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap();
        let binding = &outcome.tools[0].binding;
        assert_eq!(binding.owner, "MailService");
        assert_eq!(binding.method, "send_reply");
        // overrides are deliberate, so no routing warning is emitted
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_object_without_model_name_infers_from_param_name() {
        let tools = vec![record(
            "update_mail_rules",
            None,
            vec![param("rule_config", "object", true, None, None)],
        )];
        let outcome = ToolAnalyzer
            .analyze(&tools, &ScanOutcome::default(), &InternalArgMap::new())
            .unwrap();
        let rule = &outcome.tools[0].params[0];
        assert_eq!(rule.kind, ParamKind::Object);
        assert_eq!(rule.class_name.as_deref(), Some("RuleConfig"));
    }

    #[test]
    fn test_custom_schema_type_is_object_with_that_class() {
        let tools = vec![record(
            "set_importance",
            None,
            vec![param("importance", "Importance", true, None, None)],
        )];
        let outcome = ToolAnalyzer
            .analyze(&tools, &ScanOutcome::default(), &InternalArgMap::new())
            .unwrap();
        let importance = &outcome.tools[0].params[0];
        assert_eq!(importance.kind, ParamKind::Object);
        assert_eq!(importance.class_name.as_deref(), Some("Importance"));
    }

    #[test]
    fn test_validate_accepts_analysis_output() {
        let tools = vec![record(
            "list_mail",
            Some("fetch_filter"),
            vec![param("top", "integer", false, None, None)],
        )];
        let outcome = ToolAnalyzer
            .analyze(&tools, &mail_scan(), &InternalArgMap::new())
            .unwrap();
        assert!(ToolAnalyzer.validate(&outcome));
    }
}
