//! Result cache scoped to one index generation.
//!
//! A cache lives inside the snapshot it serves, so a rebuild discards it as a
//! whole together with the index it was computed from.

use std::any::Any;
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use log::debug;

use crate::corpus::ScopeFilter;
use crate::error::Result;
use crate::filter::ResolvedFilter;
use crate::researcher::{ProfileKey, SearchRequest};

/// Cached operation and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Overview,
    KeywordStats { top: usize },
    KeywordSeries { keyword: String },
    Top5Trends,
    RisingKeywords { top: usize },
    BurstKeywords { top: usize },
    WordCloud { top: usize },
    Network { top_keywords: usize, edge_top: usize },
    Heatmap { top_keywords: usize },
    RelatedReports { keyword: String, limit: usize },
    Search { request: SearchRequest },
    SimilarResearchers { key: ProfileKey, limit: usize },
}

/// Operation plus the canonical filter it ran under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub op: Operation,
    pub filter: ResolvedFilter,
}

impl CacheKey {
    pub fn new(op: Operation, filter: ResolvedFilter) -> Self {
        Self { op, filter }
    }

    /// Key of a researcher operation, which only depends on the scope.
    pub fn scoped(op: Operation, scope: ScopeFilter) -> Self {
        Self {
            op,
            filter: ResolvedFilter { scope, ..ResolvedFilter::default() },
        }
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Concurrent memo table of computed results.
///
/// Values are computed outside the map lock. Two readers racing on the same
/// key may both compute; the first insert wins and both get that value.
pub struct ResultCache {
    generation: u64,
    entries: DashMap<CacheKey, Entry, RandomState>,
}

impl ResultCache {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Index generation every entry was computed against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get<T>(&self, key: &CacheKey) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        entry.downcast::<T>().ok()
    }

    pub fn get_or_compute<T, F>(&self, key: CacheKey, compute: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        debug!("cache miss (generation {}): {:?}", self.generation, key);
        let value = Arc::new(compute());
        self.publish(key, value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute); errors are returned and never stored.
    pub fn get_or_try_compute<T, F>(&self, key: CacheKey, compute: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        debug!("cache miss (generation {}): {:?}", self.generation, key);
        let value = Arc::new(compute()?);
        Ok(self.publish(key, value))
    }

    fn publish<T>(&self, key: CacheKey, value: Arc<T>) -> Arc<T>
    where
        T: Any + Send + Sync,
    {
        let stored = Arc::clone(self.entries.entry(key).or_insert_with(|| value.clone() as Entry).value());
        stored.downcast::<T>().unwrap_or(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("generation", &self.generation)
            .field("entries", &self.entries.len())
            .finish()
    }
}
