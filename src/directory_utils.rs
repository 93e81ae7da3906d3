//! Directory traversal utilities for source scanning
//!
//! Thin wrappers over `walkdir` shared by the service scanner and the
//! registry's fingerprint computation, so both consult exactly the same set
//! of files.

use crate::context::GenerationContext;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walk a directory recursively and collect files with one of the given
/// extensions, skipping anything the context excludes
///
/// Results are sorted by path so every consumer sees a deterministic order.
pub fn walk_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
    ctx: &GenerationContext,
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            // exclusions apply below the root; a caller-chosen root is walked
            // even when its own ancestry carries an excluded name
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            !ctx.is_excluded(relative)
        })
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let ext = path.extension().and_then(|s| s.to_str())?;
            if extensions.contains(&ext) {
                Some(path.to_path_buf())
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// All Python source files a context's scan roots contain, in walk order
pub fn collect_source_files(ctx: &GenerationContext) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in ctx.scan_roots() {
        if !root.exists() {
            tracing::debug!("scan root {} does not exist, skipping", root.display());
            continue;
        }
        files.extend(walk_files_with_extensions(root, &["py"], ctx));
    }
    files
}
