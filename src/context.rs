//! Generation context describing a single generation run
//!
//! A [`GenerationContext`] is constructed once per invocation by the calling
//! layer, handed to the registry, and discarded afterwards. It is immutable
//! once built; the registry uses the whole context as its cache key, so two
//! runs with identical contexts over identical files share one aggregate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path components that are skipped during source walks unless the caller
/// overrides the exclusion list
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "__pycache__",
    ".venv",
    "venv",
    "tests",
    "node_modules",
    ".git",
];

/// Which collectors a pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    /// Run every collector: catalog, internal defaults, source scan, type scan
    Full,
    /// Skip the source-tree scan, the type-file scan, and analysis; custom
    /// types are still harvested from the catalog and the internal defaults
    CatalogOnly,
}

/// Immutable description of one generation run
///
/// Absence of the optional paths is a valid state, not an error: a context
/// with no internal-defaults file and no scan root simply produces empty
/// fragments for those collectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationContext {
    /// Identifier of the generation target (used for cache diagnostics and
    /// echoed into the render context)
    pub target: String,
    /// Path to the externally authored tool catalog
    pub catalog_path: PathBuf,
    /// Path to the internal-defaults file; `None` means the conventional
    /// sibling locations of the catalog are tried instead
    pub internal_args_path: Option<PathBuf>,
    /// Root directory scanned for annotated service callables
    pub scan_root: Option<PathBuf>,
    /// Additional directories scanned alongside the root
    pub extra_scan_roots: Vec<PathBuf>,
    /// Type-definition files scanned for structured-model declarations
    pub type_files: Vec<PathBuf>,
    /// Path components excluded from source walks
    pub exclusions: Vec<String>,
    /// Whether the registry may serve this context from its cache
    pub cache_enabled: bool,
    /// Which collectors run
    pub mode: CollectionMode,
}

impl GenerationContext {
    /// Create a context for `target` reading tools from `catalog_path`, with
    /// default exclusions, caching enabled, and full collection mode
    pub fn new(target: impl Into<String>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            catalog_path: catalog_path.into(),
            internal_args_path: None,
            scan_root: None,
            extra_scan_roots: Vec::new(),
            type_files: Vec::new(),
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            cache_enabled: true,
            mode: CollectionMode::Full,
        }
    }

    /// Set the internal-defaults file path
    pub fn with_internal_args(mut self, path: impl Into<PathBuf>) -> Self {
        self.internal_args_path = Some(path.into());
        self
    }

    /// Set the source-scan root
    pub fn with_scan_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.scan_root = Some(path.into());
        self
    }

    /// Add a directory scanned alongside the scan root
    pub fn with_extra_scan_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra_scan_roots.push(path.into());
        self
    }

    /// Add a type-definition file
    pub fn with_type_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.type_files.push(path.into());
        self
    }

    /// Replace the exclusion list
    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Enable or disable cache participation
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the collection mode
    pub fn with_mode(mut self, mode: CollectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// All directories the service scanner walks, in order
    pub fn scan_roots(&self) -> Vec<&Path> {
        let mut roots = Vec::new();
        if let Some(root) = &self.scan_root {
            roots.push(root.as_path());
        }
        for extra in &self.extra_scan_roots {
            roots.push(extra.as_path());
        }
        roots
    }

    /// Whether a path is excluded by one of its components
    pub fn is_excluded(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .map(|name| self.exclusions.iter().any(|ex| ex == name))
                .unwrap_or(false)
        })
    }
}
