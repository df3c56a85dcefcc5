//! Session statement cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::Statement;

/// Bounded LRU cache of compiled statements, keyed by SQL text.
///
/// A capacity of zero disables caching entirely: every lookup misses and
/// nothing is ever inserted.
pub struct StatementCache {
    cache: Option<LruCache<String, Arc<dyn Statement>>>,
}

impl std::fmt::Debug for StatementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementCache")
            .field("enabled", &self.enabled())
            .field("len", &self.len())
            .finish()
    }
}

impl StatementCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Cached statement for the SQL text, if present and reusable.
    ///
    /// Reusable hits are reset before they are returned, so a hit is
    /// indistinguishable from a fresh compile.
    pub fn get(&mut self, sql: &str) -> Option<Arc<dyn Statement>> {
        let statement = self.cache.as_mut()?.get(sql)?;
        if statement.can_reuse() {
            statement.reuse();
            Some(statement.clone())
        } else {
            None
        }
    }

    /// Insert a statement if it reports itself cacheable, evicting the
    /// least recently used entry at capacity.
    pub fn put(&mut self, sql: &str, statement: Arc<dyn Statement>) {
        if let Some(cache) = self.cache.as_mut() {
            if statement.cacheable() {
                cache.put(sql.to_owned(), statement);
            }
        }
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.cache
            .as_ref()
            .map(|cache| cache.contains(sql))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
