//! Rendered-view cache keyed by route path.
//!
//! Pages store their rendered HTML here; mutations call
//! [`ViewCache::revalidate_path`] so the next view of that route is rendered
//! from the store again. Each revalidation bumps a per-path generation, and a
//! page rendered from data read before that bump is not stored.

use crate::services::metrics::record_cache_lookup;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CachedView {
    html: Arc<str>,
    rendered_at: Instant,
}

#[derive(Default)]
pub struct ViewCache {
    entries: DashMap<String, CachedView>,
    generations: DashMap<String, u64>,
    max_age: Option<Duration>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `max_age` are treated as stale.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..Self::default()
        }
    }

    pub fn get(&self, path: &str) -> Option<Arc<str>> {
        let fresh = self
            .entries
            .get(path)
            .and_then(|entry| (!self.is_expired(&entry)).then(|| entry.html.clone()));

        if fresh.is_none() {
            self.entries
                .remove_if(path, |_, entry| self.is_expired(entry));
        }

        record_cache_lookup(fresh.is_some());
        fresh
    }

    pub fn store(&self, path: &str, html: impl Into<Arc<str>>) {
        self.entries.insert(
            path.to_string(),
            CachedView {
                html: html.into(),
                rendered_at: Instant::now(),
            },
        );
    }

    /// Revalidation count of `path`. Read it before loading the data a view
    /// is rendered from, then pass it to [`ViewCache::store_if_unchanged`].
    pub fn generation(&self, path: &str) -> u64 {
        self.generations.get(path).map(|g| *g).unwrap_or(0)
    }

    /// Store `html` unless `path` was revalidated after `generation` was read.
    /// Returns whether the view was stored.
    pub fn store_if_unchanged(
        &self,
        path: &str,
        generation: u64,
        html: impl Into<Arc<str>>,
    ) -> bool {
        // Holding the generation guard across the insert orders this store
        // against a concurrent revalidate_path.
        let current = self.generations.get(path);
        if current.as_deref().copied().unwrap_or(0) != generation {
            tracing::debug!(
                path = %path,
                generation,
                "Dropped view rendered before revalidation"
            );
            return false;
        }
        self.store(path, html);
        drop(current);
        true
    }

    /// Mark the cached rendering of `path` stale. Returns whether one existed.
    pub fn revalidate_path(&self, path: &str) -> bool {
        let mut generation = self.generations.entry(path.to_string()).or_insert(0);
        *generation += 1;
        let removed = self.entries.remove(path).is_some();
        drop(generation);

        tracing::debug!(path = %path, removed, "Revalidated cached view");
        removed
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    fn is_expired(&self, entry: &CachedView) -> bool {
        self.max_age
            .is_some_and(|max_age| entry.rendered_at.elapsed() >= max_age)
    }
}
