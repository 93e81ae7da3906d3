//! Aggregate caching with file-change-aware invalidation
//!
//! One generation pass is expensive (full source walk plus analysis), so the
//! registry memoizes the aggregate per generation context. An entry is served
//! only while its time-to-live has not elapsed and its file fingerprint still
//! matches the current on-disk state; either condition failing evicts the
//! entry and forces a full recomputation. Entries are replaced whole, never
//! patched.

use crate::context::{CollectionMode, GenerationContext};
use crate::directory_utils::collect_source_files;
use crate::internal_args::resolve_args_path;
use crate::registry::MetadataAggregate;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};

/// Default number of cached aggregates
pub const DEFAULT_AGGREGATE_CACHE_SIZE: usize = 64;

/// Default entry time-to-live
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Entries served from cache
    pub hits: u64,
    /// Lookups that required a recomputation
    pub misses: u64,
    /// Entries dropped by expiry, invalidation, or replacement
    pub evictions: u64,
    /// Current entry count
    pub size: usize,
    /// Maximum entry count
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// One memoized aggregate
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The aggregate produced by a full pass
    pub aggregate: Arc<MetadataAggregate>,
    /// When the entry was created
    pub created_at: Instant,
    /// File fingerprint at creation time
    pub fingerprint: String,
}

impl CacheEntry {
    /// Whether the time-to-live has elapsed
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// LRU cache of aggregates keyed by generation context
///
/// Mutation happens through `&mut self`; callers sharing a registry across
/// threads must add their own mutual exclusion around the read-check-write
/// sequence.
pub struct AggregateCache {
    entries: LruCache<GenerationContext, CacheEntry>,
    ttl: Duration,
    stats: CacheStats,
}

impl AggregateCache {
    /// Cache with default capacity and time-to-live
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_AGGREGATE_CACHE_SIZE, DEFAULT_CACHE_TTL)
    }

    /// Cache with explicit capacity and time-to-live
    pub fn with_settings(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_AGGREGATE_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            stats: CacheStats {
                capacity: capacity.get(),
                ..CacheStats::default()
            },
        }
    }

    /// Look up a fresh entry for a context
    ///
    /// A stale entry (expired or fingerprint mismatch) is popped so the
    /// caller's recomputation replaces it.
    pub fn get(
        &mut self,
        ctx: &GenerationContext,
        fingerprint: &str,
    ) -> Option<Arc<MetadataAggregate>> {
        let fresh = match self.entries.get(ctx) {
            Some(entry) => {
                if entry.is_expired(self.ttl) {
                    tracing::debug!("cache entry for target '{}' expired", ctx.target);
                    None
                } else if entry.fingerprint != fingerprint {
                    tracing::debug!(
                        "cache entry for target '{}' invalidated by file changes",
                        ctx.target
                    );
                    None
                } else {
                    Some(entry.aggregate.clone())
                }
            }
            None => None,
        };
        match fresh {
            Some(aggregate) => {
                self.stats.hits += 1;
                Some(aggregate)
            }
            None => {
                if self.entries.pop(ctx).is_some() {
                    self.stats.evictions += 1;
                }
                self.stats.misses += 1;
                self.stats.size = self.entries.len();
                None
            }
        }
    }

    /// Store the aggregate for a context
    pub fn put(
        &mut self,
        ctx: GenerationContext,
        aggregate: Arc<MetadataAggregate>,
        fingerprint: String,
    ) {
        let entry = CacheEntry {
            aggregate,
            created_at: Instant::now(),
            fingerprint,
        };
        if self.entries.put(ctx, entry).is_some() {
            self.stats.evictions += 1;
        }
        self.stats.size = self.entries.len();
    }

    /// Drop the entry for one context
    pub fn invalidate(&mut self, ctx: &GenerationContext) {
        if self.entries.pop(ctx).is_some() {
            self.stats.evictions += 1;
            self.stats.size = self.entries.len();
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        let size = self.entries.len();
        self.entries.clear();
        self.stats.evictions += size as u64;
        self.stats.size = 0;
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint the files a pass over this context would consult
///
/// Modification times of the catalog file, the resolved defaults file, and
/// (in full mode) every type file and every non-excluded source file are
/// rendered as sorted `path=secs.nanos` pairs and digested. Any change to the
/// consulted set, including additions and removals, changes the digest.
pub fn compute_fingerprint(ctx: &GenerationContext) -> String {
    let mut files: Vec<PathBuf> = Vec::new();
    if ctx.catalog_path.exists() {
        files.push(ctx.catalog_path.clone());
    }
    if let Some(args_path) = resolve_args_path(ctx) {
        files.push(args_path);
    }
    if ctx.mode == CollectionMode::Full {
        files.extend(ctx.type_files.iter().filter(|f| f.exists()).cloned());
        files.extend(collect_source_files(ctx));
    }

    let mut parts: Vec<String> = files
        .iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(path).ok()?.modified().ok()?;
            let stamp = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
            Some(format!(
                "{}={}.{}",
                path.display(),
                stamp.as_secs(),
                stamp.subsec_nanos()
            ))
        })
        .collect();
    parts.sort();
    parts.dedup();
    format!("{:x}", md5::compute(parts.join(";")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ctx_for(dir: &TempDir) -> GenerationContext {
        GenerationContext::new("cache-test", dir.path().join("catalog.json"))
    }

    fn aggregate() -> Arc<MetadataAggregate> {
        Arc::new(MetadataAggregate::default())
    }

    #[test]
    fn test_hit_requires_matching_fingerprint() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_for(&dir);
        let mut cache = AggregateCache::new();
        cache.put(ctx.clone(), aggregate(), "fp-1".to_string());

        assert!(cache.get(&ctx, "fp-1").is_some());
        // fingerprint drift pops the entry
        assert!(cache.get(&ctx, "fp-2").is_none());
        assert!(cache.get(&ctx, "fp-1").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_expired_entry_is_popped() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_for(&dir);
        let mut cache = AggregateCache::with_settings(4, Duration::ZERO);
        cache.put(ctx.clone(), aggregate(), "fp".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&ctx, "fp").is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_clear_and_hit_rate() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_for(&dir);
        let mut cache = AggregateCache::new();
        cache.put(ctx.clone(), aggregate(), "fp".to_string());
        assert!(cache.get(&ctx, "fp").is_some());
        assert!(cache.get(&ctx_for(&dir).with_cache(false), "fp").is_none());
        let stats = cache.stats();
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

        cache.clear();
        assert_eq!(cache.stats().size, 0);
        assert!(cache.get(&ctx, "fp").is_none());
    }

    #[test]
    fn test_fingerprint_tracks_file_changes() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("catalog.json");
        fs::write(&catalog, "[]").unwrap();
        let ctx = GenerationContext::new("t", &catalog);

        let before = compute_fingerprint(&ctx);
        assert_eq!(before, compute_fingerprint(&ctx));

        filetime::set_file_mtime(&catalog, filetime::FileTime::from_unix_time(1_700_000_000, 0))
            .unwrap();
        let after = compute_fingerprint(&ctx);
        assert_ne!(before, after);
    }

    #[test]
    fn test_fingerprint_covers_scanned_sources() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("catalog.json");
        fs::write(&catalog, "[]").unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        let source = root.join("svc.py");
        fs::write(&source, "x = 1\n").unwrap();

        let ctx = GenerationContext::new("t", &catalog).with_scan_root(&root);
        let before = compute_fingerprint(&ctx);
        filetime::set_file_mtime(&source, filetime::FileTime::from_unix_time(1_700_000_001, 0))
            .unwrap();
        assert_ne!(before, compute_fingerprint(&ctx));

        // catalog-only mode ignores the source tree
        let catalog_only = ctx.clone().with_mode(CollectionMode::CatalogOnly);
        let co_before = compute_fingerprint(&catalog_only);
        filetime::set_file_mtime(&source, filetime::FileTime::from_unix_time(1_700_000_002, 0))
            .unwrap();
        assert_eq!(co_before, compute_fingerprint(&catalog_only));
    }
}
