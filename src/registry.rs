//! Pipeline orchestration
//!
//! The registry owns the five collectors and the aggregate cache, and runs
//! one generation pass in fixed dependency order: catalog and internal
//! defaults first, then the source scan, then type references (which need
//! the prior three for harvesting), then analysis. The caller receives either
//! a complete aggregate with possibly non-empty warnings, or the one fatal
//! error class from analysis.
//!
//! A registry is meant to be held across sequential generation requests so
//! the cache pays off. It is not safe for concurrent use; callers on multiple
//! threads must serialize access themselves.

use crate::analyzer::{AnalysisOutcome, AnalyzedTool, ToolAnalyzer};
use crate::cache::{compute_fingerprint, AggregateCache, CacheStats};
use crate::catalog::{ToolCatalogCollector, ToolRecord};
use crate::collector::Collector;
use crate::context::{CollectionMode, GenerationContext};
use crate::error::Result;
use crate::internal_args::{InternalArgMap, InternalArgsCollector};
use crate::scanner::{HandlerEntry, ScanOutcome, ServiceScanner};
use crate::type_refs::{harvest_custom_types, TypeRefCollector, TypeReference};
use crate::validation::{ValidationLevel, ValidationReport};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// Banner string the renderer embeds in generated output
pub const GENERATED_NOTE: &str =
    "Generated by toolsmith; edit the tool catalog, not this file.";

/// Everything one pass collected and resolved
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataAggregate {
    /// Target identifier from the generation context
    pub target: String,
    /// Tool records, catalog order
    pub tools: Vec<ToolRecord>,
    /// Collected internal defaults
    pub internal_args: InternalArgMap,
    /// Source-scan output
    pub scan: ScanOutcome,
    /// Type references discovered in designated type files
    pub type_references: Vec<TypeReference>,
    /// Merged custom type names, sorted and de-duplicated
    pub custom_types: Vec<String>,
    /// Renderer-ready tool resolutions, catalog order
    pub analyzed: Vec<AnalyzedTool>,
    /// Advisory problems accumulated across the pass
    pub warnings: Vec<String>,
    /// Advisory structural failures found while validating fragments
    pub errors: Vec<String>,
    /// File fingerprint the pass was computed against
    pub fingerprint: String,
}

/// Fixed-key projection consumed by the template renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderContext {
    /// Target identifier
    pub target: String,
    /// Analyzed tools, catalog order
    pub tools: Vec<AnalyzedTool>,
    /// Sorted custom type names
    pub custom_types: Vec<String>,
    /// Handler type name to module/instance
    pub handlers: BTreeMap<String, HandlerEntry>,
    /// Echoed internal-argument map
    pub internal_args: InternalArgMap,
    /// Generated-file banner for the renderer to embed
    pub generated_note: String,
}

/// Counts and diagnostics for one aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Target identifier
    pub target: String,
    /// Catalog records
    pub tool_count: usize,
    /// Scanned services
    pub service_count: usize,
    /// Handler types
    pub handler_count: usize,
    /// Merged custom types
    pub custom_type_count: usize,
    /// Declared internal arguments across all tools
    pub internal_arg_count: usize,
    /// Analyzed tools
    pub analyzed_count: usize,
    /// Advisory warnings
    pub warnings: Vec<String>,
    /// Advisory errors
    pub errors: Vec<String>,
}

/// Orchestrates collectors, analysis, and caching
pub struct MetadataRegistry {
    catalog: ToolCatalogCollector,
    internal_args: InternalArgsCollector,
    scanner: ServiceScanner,
    type_refs: TypeRefCollector,
    analyzer: ToolAnalyzer,
    cache: AggregateCache,
}

impl MetadataRegistry {
    /// Registry with default cache settings
    pub fn new() -> Self {
        Self {
            catalog: ToolCatalogCollector,
            internal_args: InternalArgsCollector,
            scanner: ServiceScanner,
            type_refs: TypeRefCollector,
            analyzer: ToolAnalyzer,
            cache: AggregateCache::new(),
        }
    }

    /// Registry with explicit cache capacity and time-to-live
    pub fn with_cache_settings(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: AggregateCache::with_settings(capacity, ttl),
            ..Self::new()
        }
    }

    /// Run or reuse a full pass for this context
    ///
    /// The cache serves an aggregate only while its time-to-live holds and
    /// the file fingerprint still matches; otherwise every collector runs
    /// again and the entry is replaced.
    pub fn collect_all(&mut self, ctx: &GenerationContext) -> Result<Arc<MetadataAggregate>> {
        let fingerprint = compute_fingerprint(ctx);
        if ctx.cache_enabled {
            if let Some(aggregate) = self.cache.get(ctx, &fingerprint) {
                tracing::debug!("serving aggregate for target '{}' from cache", ctx.target);
                return Ok(aggregate);
            }
        }
        let aggregate = Arc::new(self.run_pass(ctx, fingerprint.clone())?);
        if ctx.cache_enabled {
            self.cache.put(ctx.clone(), aggregate.clone(), fingerprint);
        }
        Ok(aggregate)
    }

    fn run_pass(&self, ctx: &GenerationContext, fingerprint: String) -> Result<MetadataAggregate> {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let tools = collect_or_minimal(&self.catalog, ctx, &mut warnings);
        let internal_args = collect_or_minimal(&self.internal_args, ctx, &mut warnings);
        let scan = match ctx.mode {
            CollectionMode::Full => collect_or_minimal(&self.scanner, ctx, &mut warnings),
            CollectionMode::CatalogOnly => self.scanner.collect_minimal(ctx),
        };
        warnings.extend(scan.warnings.iter().cloned());
        let type_references = match ctx.mode {
            CollectionMode::Full => collect_or_minimal(&self.type_refs, ctx, &mut warnings),
            CollectionMode::CatalogOnly => self.type_refs.collect_minimal(ctx),
        };

        let mut custom_types: BTreeSet<String> = harvest_custom_types(&tools, &internal_args);
        custom_types.extend(type_references.iter().map(|r| r.name.clone()));
        custom_types.extend(
            scan.services
                .values()
                .flat_map(|d| d.parameters.iter().filter_map(|p| p.custom_type.clone())),
        );

        if !self.catalog.validate(&tools) {
            errors.push("tool catalog failed structural validation".to_string());
        }
        if !self.internal_args.validate(&internal_args) {
            errors.push("internal arguments failed structural validation".to_string());
        }
        if !self.scanner.validate(&scan) {
            errors.push("scan output failed structural validation".to_string());
        }
        if !self.type_refs.validate(&type_references) {
            errors.push("type references failed structural validation".to_string());
        }

        // analysis depends on the scan, so catalog-only passes skip it
        let analysis = match ctx.mode {
            CollectionMode::Full => self.analyzer.analyze(&tools, &scan, &internal_args)?,
            CollectionMode::CatalogOnly => AnalysisOutcome::default(),
        };
        warnings.extend(analysis.warnings.iter().cloned());
        if ctx.mode == CollectionMode::Full && !self.analyzer.validate(&analysis) {
            errors.push("analysis output failed structural validation".to_string());
        }

        Ok(MetadataAggregate {
            target: ctx.target.clone(),
            tools,
            internal_args,
            scan,
            type_references,
            custom_types: custom_types.into_iter().collect(),
            analyzed: analysis.tools,
            warnings,
            errors,
            fingerprint,
        })
    }

    /// Project the aggregate into the renderer's fixed-key context
    pub fn to_render_context(&mut self, ctx: &GenerationContext) -> Result<RenderContext> {
        let aggregate = self.collect_all(ctx)?;
        Ok(RenderContext {
            target: aggregate.target.clone(),
            tools: aggregate.analyzed.clone(),
            custom_types: aggregate.custom_types.clone(),
            handlers: aggregate.scan.handlers.clone(),
            internal_args: aggregate.internal_args.clone(),
            generated_note: GENERATED_NOTE.to_string(),
        })
    }

    /// Run every collector's structural check over freshly collected
    /// fragments, without touching the cache
    ///
    /// The one fatal analysis class is reported here as an error-level issue
    /// instead of propagating, so a report is always produced.
    pub fn validate_all(&self, ctx: &GenerationContext) -> ValidationReport {
        let mut report = ValidationReport::new();

        let tools = self.catalog.collect_with_fallback(ctx);
        let mut seen = BTreeSet::new();
        for tool in &tools {
            if !seen.insert(tool.name.clone()) {
                report.add(
                    ValidationLevel::Error,
                    self.catalog.name(),
                    format!("duplicate tool name '{}'", tool.name),
                );
            }
            if tool.name.is_empty() {
                report.add(
                    ValidationLevel::Error,
                    self.catalog.name(),
                    "tool record with empty name",
                );
            }
        }

        let internal_args = self.internal_args.collect_with_fallback(ctx);
        for (tool, args) in &internal_args {
            for (name, arg) in args {
                if arg.target_param.is_none() {
                    report.add(
                        ValidationLevel::Error,
                        self.internal_args.name(),
                        format!(
                            "internal argument '{name}' of tool '{tool}' has no target parameter binding"
                        ),
                    );
                }
            }
        }

        let scan = match ctx.mode {
            CollectionMode::Full => self.scanner.collect_with_fallback(ctx),
            CollectionMode::CatalogOnly => self.scanner.collect_minimal(ctx),
        };
        if !self.scanner.validate(&scan) {
            report.add(
                ValidationLevel::Error,
                self.scanner.name(),
                "scan output failed structural validation",
            );
        }
        for warning in &scan.warnings {
            report.add(ValidationLevel::Warning, self.scanner.name(), warning.clone());
        }

        let type_references = match ctx.mode {
            CollectionMode::Full => self.type_refs.collect_with_fallback(ctx),
            CollectionMode::CatalogOnly => self.type_refs.collect_minimal(ctx),
        };
        if !self.type_refs.validate(&type_references) {
            report.add(
                ValidationLevel::Error,
                self.type_refs.name(),
                "type references failed structural validation",
            );
        }

        if ctx.mode == CollectionMode::Full {
            match self.analyzer.analyze(&tools, &scan, &internal_args) {
                Ok(analysis) => {
                    if !self.analyzer.validate(&analysis) {
                        report.add(
                            ValidationLevel::Error,
                            self.analyzer.name(),
                            "analysis output failed structural validation",
                        );
                    }
                    for warning in &analysis.warnings {
                        report.add(
                            ValidationLevel::Warning,
                            self.analyzer.name(),
                            warning.clone(),
                        );
                    }
                }
                Err(err) => {
                    report.add(ValidationLevel::Error, self.analyzer.name(), err.to_string());
                }
            }
        }

        report
    }

    /// Counts and diagnostics for this context's aggregate
    pub fn get_summary(&mut self, ctx: &GenerationContext) -> Result<Summary> {
        let aggregate = self.collect_all(ctx)?;
        Ok(Summary {
            target: aggregate.target.clone(),
            tool_count: aggregate.tools.len(),
            service_count: aggregate.scan.services.len(),
            handler_count: aggregate.scan.handlers.len(),
            custom_type_count: aggregate.custom_types.len(),
            internal_arg_count: aggregate.internal_args.values().map(BTreeMap::len).sum(),
            analyzed_count: aggregate.analyzed.len(),
            warnings: aggregate.warnings.clone(),
            errors: aggregate.errors.clone(),
        })
    }

    /// Snapshot of the cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop the cached aggregate for one context, forcing the next
    /// `collect_all` to recompute
    pub fn invalidate(&mut self, ctx: &GenerationContext) {
        self.cache.invalidate(ctx);
    }

    /// Drop every cached aggregate
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect one fragment, degrading to minimal with a recorded warning
fn collect_or_minimal<C: Collector>(
    collector: &C,
    ctx: &GenerationContext,
    warnings: &mut Vec<String>,
) -> C::Fragment {
    match collector.collect(ctx) {
        Ok(fragment) => fragment,
        Err(err) => {
            let message = format!(
                "collector '{}' degraded to minimal fragment: {err}",
                collector.name()
            );
            tracing::warn!("{message}");
            warnings.push(message);
            collector.collect_minimal(ctx)
        }
    }
}
