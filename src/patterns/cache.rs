use crate::error::EngineError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

// Limit cache size to prevent uncontrolled memory growth
const MAX_CACHE_SIZE: usize = 1000;
const DEFAULT_TTL: Duration = Duration::from_secs(300);
const MAX_REGEX_COMPLEXITY: usize = 1000;

/// A cache entry with value and expiration time
#[derive(Clone, Debug)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Metrics for cache performance monitoring
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheMetrics {
    /// Calculates the cache hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

struct Inner<T> {
    entries: LruCache<String, CacheEntry<T>>,
    metrics: CacheMetrics,
}

/// Compiled-pattern memo with LRU eviction and TTL
///
/// Shared by every invocation in the process. It only memoizes pure
/// compilations, so sharing it never leaks state between calls.
struct CompileCache<T> {
    inner: Mutex<Inner<T>>,
    ttl: Duration,
}

impl<T: Clone> CompileCache<T> {
    fn new(ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(MAX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Retrieves a cached value if present and not expired
    fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.lock();
        let inner = &mut *inner;

        if let Some(entry) = inner.entries.get(key) {
            if entry.expires_at > Instant::now() {
                inner.metrics.hits += 1;
                return Some(entry.value.clone());
            }
            inner.entries.pop(key);
            inner.metrics.size = inner.entries.len();
            inner.metrics.evictions += 1;
        }

        inner.metrics.misses += 1;
        None
    }

    /// Stores a value in the cache with TTL
    fn put(&self, key: String, value: T) {
        let mut inner = self.lock();
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        // `push` also hands back the old entry when the key was already present.
        if let Some((old, _)) = inner.entries.push(key.clone(), entry) {
            if old != key {
                inner.metrics.evictions += 1;
            }
        }
        inner.metrics.size = inner.entries.len();
    }

    fn metrics(&self) -> CacheMetrics {
        self.lock().metrics.clone()
    }
}

// Global cache instances
static GLOB_CACHE: Lazy<CompileCache<GlobSet>> = Lazy::new(|| CompileCache::new(DEFAULT_TTL));
static REGEX_CACHE: Lazy<CompileCache<Regex>> = Lazy::new(|| CompileCache::new(DEFAULT_TTL));

/// Retrieves a compiled GlobSet for a list of alternatives from cache or compiles it
///
/// Every alternative is compiled with `literal_separator`, so `*` and `?`
/// never cross a `/`.
///
/// # Errors
///
/// Returns `EngineError::Syntax` for invalid glob syntax
pub fn get_or_compile_glob(
    alternatives: &[String],
    case_sensitive: bool,
) -> Result<GlobSet, EngineError> {
    let key = format!("{}\u{0}{}", case_sensitive, alternatives.join("\u{0}"));
    if let Some(cached) = GLOB_CACHE.get(&key) {
        return Ok(cached);
    }

    let mut builder = GlobSetBuilder::new();
    for alternative in alternatives {
        let glob = GlobBuilder::new(alternative)
            .literal_separator(true)
            .case_insensitive(!case_sensitive)
            .backslash_escape(true)
            .build()?;
        builder.add(glob);
    }
    let set = builder.build()?;

    GLOB_CACHE.put(key, set.clone());
    Ok(set)
}

/// Retrieves a compiled Regex from cache or compiles and caches it
///
/// # Errors
///
/// Returns `EngineError::RegexTooComplex` for patterns that exceed complexity limits
pub fn get_or_compile_regex(pat: &str) -> Result<Regex, EngineError> {
    // Complexity checks to prevent ReDoS attacks
    if pat.len() > 4096 || pat.matches('(').count() > MAX_REGEX_COMPLEXITY {
        return Err(EngineError::RegexTooComplex);
    }

    if let Some(cached) = REGEX_CACHE.get(pat) {
        return Ok(cached);
    }

    let re = Regex::new(pat)?;
    REGEX_CACHE.put(pat.to_string(), re.clone());
    Ok(re)
}

/// Returns metrics for the glob cache
pub fn glob_cache_metrics() -> CacheMetrics {
    GLOB_CACHE.metrics()
}

/// Returns metrics for the regex cache
pub fn regex_cache_metrics() -> CacheMetrics {
    REGEX_CACHE.metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cache: CompileCache<u32> = CompileCache::new(Duration::ZERO);
        cache.put("a".into(), 1);
        assert_eq!(cache.get("a"), None);

        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.evictions, 1);
        assert_eq!(metrics.size, 0);
    }

    #[test]
    fn hits_are_counted() {
        let cache: CompileCache<u32> = CompileCache::new(Duration::from_secs(60));
        cache.put("a".into(), 7);
        assert_eq!(cache.get("a"), Some(7));
        assert_eq!(cache.get("b"), None);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn compiled_globs_respect_separators() {
        let set = get_or_compile_glob(&["/a/*.js".to_string()], true).unwrap();
        assert!(set.is_match("/a/x.js"));
        assert!(!set.is_match("/a/b/x.js"));
    }

    #[test]
    fn invalid_glob_is_a_syntax_error() {
        let err = get_or_compile_glob(&["/a/[b".to_string()], true).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn overly_long_regex_is_rejected() {
        let pat = "(a)".repeat(MAX_REGEX_COMPLEXITY + 1);
        assert!(matches!(
            get_or_compile_regex(&pat),
            Err(EngineError::RegexTooComplex)
        ));
    }
}
