//! # Toolsmith
//!
//! A metadata-aggregation pipeline for generated tool servers.
//!
//! ## Features
//!
//! - **Tool Catalog**: load externally authored tool records from JSON, YAML,
//!   or a literal embedded in Python source
//! - **Internal Defaults**: pre-filled parameter values hidden from external
//!   callers, with schema-default back-fill
//! - **Service Scanner**: static parsing of a Python source tree for
//!   annotated handler callables, no code execution
//! - **Type References**: structured-model discovery plus custom-type
//!   harvesting across every fragment
//! - **Tool Analyzer**: cross-references the above into renderer-ready tool
//!   resolutions with handler bindings and call-expression sources
//! - **Caching Registry**: one orchestrator with a fingerprint-checked,
//!   time-bounded aggregate cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolsmith::{GenerationContext, MetadataRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = GenerationContext::new("mailserver", "config/tools.json")
//!     .with_internal_args("config/internal_args.json")
//!     .with_scan_root("app/services");
//!
//! let mut registry = MetadataRegistry::new();
//! let aggregate = registry.collect_all(&ctx)?;
//! println!(
//!     "{} tools resolved against {} services",
//!     aggregate.analyzed.len(),
//!     aggregate.scan.services.len()
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Tool resolution against scanned services and internal defaults
pub mod analyzer;

/// Python source parsing helpers shared by the static collectors
pub mod ast;

/// Aggregate cache with fingerprint and time-to-live invalidation
pub mod cache;

/// Tool catalog loading
pub mod catalog;

/// Collector capability contract
pub mod collector;

/// Generation context value object
pub mod context;

/// Directory traversal utilities
pub mod directory_utils;

/// Error types used throughout the library
pub mod error;

/// Internal-defaults loading and schema back-fill
pub mod internal_args;

/// Pipeline orchestration across the collectors
pub mod registry;

/// Static service scanning
pub mod scanner;

/// Type reference collection and custom-type harvesting
pub mod type_refs;

/// Structural validation reporting
pub mod validation;

// Re-export core types
pub use analyzer::{
    AnalysisOutcome, AnalyzedParameter, AnalyzedTool, CallBinding, CallSource, HandlerBinding,
    ParamKind, ToolAnalyzer,
};
pub use cache::CacheStats;
pub use catalog::{ToolCatalogCollector, ToolParameter, ToolRecord};
pub use collector::Collector;
pub use context::{CollectionMode, GenerationContext};
pub use error::{Result, ToolsmithError};
pub use internal_args::{ArgProvenance, InternalArg, InternalArgMap, InternalArgsCollector};
pub use registry::{
    MetadataAggregate, MetadataRegistry, RenderContext, Summary, GENERATED_NOTE,
};
pub use scanner::{
    HandlerEntry, ScanOutcome, ServiceAnnotation, ServiceDescriptor, ServiceParameter,
    ServiceScanner,
};
pub use type_refs::{harvest_custom_types, TypeRefCollector, TypeReference};
pub use validation::{ValidationIssue, ValidationLevel, ValidationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
