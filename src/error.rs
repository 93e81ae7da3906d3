//! Unified error handling for the toolsmith library
//!
//! Failures come in two tiers. Anything that goes wrong inside an individual
//! collector (missing optional file, unparsable source, malformed JSON) is
//! caught at the collector boundary and degraded to that collector's minimal
//! fragment; those errors never cross the registry. The variants below that
//! do cross it are the fatal configuration classes: an internal argument
//! without a target-parameter binding, and an explicit service reference that
//! resolves to nothing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the toolsmith library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolsmithError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Tool catalog could not be loaded or has an invalid shape
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A source file could not be parsed statically
    #[error("Failed to parse {path}: {message}")]
    SourceParse {
        /// File that failed to parse
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A tool's explicit service binding names a service the scan never found
    #[error("Tool '{tool}' is bound to unknown service '{service}'")]
    UnknownService {
        /// Tool carrying the binding
        tool: String,
        /// Service name that failed to resolve
        service: String,
    },

    /// An internal argument has no explicit target-parameter binding.
    ///
    /// This is the one non-recoverable configuration class: binding by
    /// position or by guessed name would corrupt generated call sites, so
    /// analysis aborts instead.
    #[error("Internal argument '{argument}' of tool '{tool}' has no target parameter binding")]
    UnboundInternalArgument {
        /// Tool owning the argument
        tool: String,
        /// Argument missing its `targetParam`
        argument: String,
    },

    /// Invalid generation context or collector configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for toolsmith operations
pub type Result<T> = std::result::Result<T, ToolsmithError>;
