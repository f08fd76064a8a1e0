//! The served engine: an immutable snapshot behind an atomically swapped pointer.
//!
//! Readers clone the current `Arc<Snapshot>` and work on it without further
//! locking. A stopword change builds a complete new snapshot off to the side
//! and publishes it in one pointer swap; a failed build leaves the previous
//! snapshot in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use log::{error, info};

use crate::analytics::{self, BurstKeywords, Heatmap, KeywordCount, KeywordSeries, KeywordStats, Network, Overview, RisingKeywords, TrendSeries};
use crate::cache::{CacheKey, Operation, ResultCache};
use crate::config::EngineConfig;
use crate::corpus::institute::InstituteDirectory;
use crate::corpus::{Report, ReportRef, ScopeFilter};
use crate::error::Result;
use crate::filter::{Filter, FilteredView};
use crate::index::CorpusIndex;
use crate::researcher::{self, ProfileKey, ResearcherDetail, ResearcherModel, SearchPage, SearchRequest, SimilarResearcher};
use crate::token::{SimpleTokenizer, Stopwords, Tokenizer};

/// Everything a request reads, built for one index generation.
pub struct Snapshot {
    index: CorpusIndex,
    stopwords: Stopwords,
    directory: Arc<InstituteDirectory>,
    config: Arc<EngineConfig>,
    tokenizer: Arc<dyn Tokenizer>,
    cache: ResultCache,
    /// researcher models per scope, built on first use
    models: [OnceLock<Arc<ResearcherModel>>; 3],
}

impl Snapshot {
    fn new(
        index: CorpusIndex,
        stopwords: Stopwords,
        directory: Arc<InstituteDirectory>,
        config: Arc<EngineConfig>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        let cache = ResultCache::new(index.generation());
        Self {
            index,
            stopwords,
            directory,
            config,
            tokenizer,
            cache,
            models: Default::default(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.index.generation()
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Rows selected by `filter`.
    pub fn view(&self, filter: &Filter) -> FilteredView<'_> {
        FilteredView::select(&self.index, &self.directory, filter.resolve())
    }

    /// Bounded text form of `filter`, for logs.
    pub fn signature(&self, filter: &Filter) -> String {
        filter.resolve().signature(self.config.filter.max_field_len)
    }

    fn memo<T, F>(&self, filter: &Filter, op: Operation, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&FilteredView<'_>) -> T,
    {
        let view = self.view(filter);
        let key = CacheKey::new(op, view.filter().clone());
        self.cache.get_or_compute(key, || compute(&view))
    }

    fn try_memo<T, F>(&self, filter: &Filter, op: Operation, compute: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&FilteredView<'_>) -> Result<T>,
    {
        let view = self.view(filter);
        let key = CacheKey::new(op, view.filter().clone());
        self.cache.get_or_try_compute(key, || compute(&view))
    }

    pub fn overview(&self, filter: &Filter) -> Arc<Overview> {
        self.memo(filter, Operation::Overview, analytics::overview)
    }

    pub fn keyword_stats(&self, filter: &Filter, top: usize) -> Arc<KeywordStats> {
        self.memo(filter, Operation::KeywordStats { top }, |v| analytics::keyword_stats(v, top))
    }

    pub fn keyword_series(&self, filter: &Filter, keyword: &str) -> Result<Arc<KeywordSeries>> {
        let op = Operation::KeywordSeries { keyword: keyword.to_string() };
        self.try_memo(filter, op, |v| analytics::keyword_series(v, keyword))
    }

    pub fn top5_trends(&self, filter: &Filter) -> Arc<TrendSeries> {
        self.memo(filter, Operation::Top5Trends, analytics::top5_trends)
    }

    pub fn rising_keywords(&self, filter: &Filter, top: usize) -> Arc<RisingKeywords> {
        let cfg = &self.config.analytics;
        self.memo(filter, Operation::RisingKeywords { top }, |v| analytics::rising_keywords(v, top, cfg))
    }

    pub fn burst_keywords(&self, filter: &Filter, top: usize) -> Arc<BurstKeywords> {
        let cfg = &self.config.analytics;
        self.memo(filter, Operation::BurstKeywords { top }, |v| analytics::burst_keywords(v, top, cfg))
    }

    pub fn word_cloud(&self, filter: &Filter, top: usize) -> Arc<Vec<KeywordCount>> {
        self.memo(filter, Operation::WordCloud { top }, |v| analytics::word_cloud(v, top))
    }

    pub fn network(&self, filter: &Filter, top_keywords: usize, edge_top: usize) -> Arc<Network> {
        let op = Operation::Network { top_keywords, edge_top };
        self.memo(filter, op, |v| analytics::network(v, top_keywords, edge_top))
    }

    pub fn heatmap(&self, filter: &Filter, top_keywords: usize) -> Arc<Heatmap> {
        self.memo(filter, Operation::Heatmap { top_keywords }, |v| analytics::heatmap(v, top_keywords))
    }

    pub fn related_reports(&self, filter: &Filter, keyword: &str, limit: usize) -> Result<Arc<Vec<ReportRef>>> {
        let op = Operation::RelatedReports { keyword: keyword.to_string(), limit };
        self.try_memo(filter, op, |v| analytics::related_reports(v, keyword, limit))
    }

    /// Researcher model of `scope`, built once per snapshot.
    pub fn researcher_model(&self, scope: ScopeFilter) -> Arc<ResearcherModel> {
        let slot = &self.models[scope.slot()];
        Arc::clone(slot.get_or_init(|| {
            Arc::new(ResearcherModel::build(&self.index, &self.directory, scope, &self.config.researcher))
        }))
    }

    pub fn search(&self, scope: ScopeFilter, request: &SearchRequest) -> Result<Arc<SearchPage>> {
        let key = CacheKey::scoped(Operation::Search { request: request.clone() }, scope);
        self.cache.get_or_try_compute(key, || {
            let model = self.researcher_model(scope);
            researcher::search(&*model, &*self.tokenizer, &self.stopwords, request, &self.config.researcher)
        })
    }

    pub fn researcher(&self, scope: ScopeFilter, key: &ProfileKey) -> Option<ResearcherDetail> {
        researcher::researcher(&*self.researcher_model(scope), key)
    }

    pub fn similar_researchers(&self, scope: ScopeFilter, key: &ProfileKey, limit: usize) -> Arc<Vec<SimilarResearcher>> {
        let op = Operation::SimilarResearchers { key: key.clone(), limit };
        self.cache.get_or_compute(CacheKey::scoped(op, scope), || {
            researcher::similar_researchers(&*self.researcher_model(scope), key, limit)
        })
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation())
            .field("reports", &self.index.len())
            .field("stopwords", &self.stopwords.len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Analytics and researcher matching over a report corpus.
pub struct Engine {
    tokenizer: Arc<dyn Tokenizer>,
    directory: Arc<InstituteDirectory>,
    config: Arc<EngineConfig>,
    current: RwLock<Arc<Snapshot>>,
    /// serializes rebuilds; readers never take it
    rebuild: Mutex<()>,
    next_generation: AtomicU64,
}

impl Engine {
    /// Build with the built-in tokenizer.
    pub fn new(reports: Vec<Report>, directory: InstituteDirectory, stopwords: Stopwords, config: EngineConfig) -> Result<Self> {
        let tokenizer = Arc::new(SimpleTokenizer::new(config.tokenizer.min_token_chars));
        Self::with_tokenizer(reports, directory, stopwords, config, tokenizer)
    }

    pub fn with_tokenizer(
        reports: Vec<Report>,
        directory: InstituteDirectory,
        stopwords: Stopwords,
        config: EngineConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        let index = CorpusIndex::build(Arc::new(reports), &stopwords, &*tokenizer, 1)?;
        Ok(Self::from_index(index, directory, stopwords, config, tokenizer))
    }

    /// Serve an index restored from a snapshot. `stopwords` must be the set it was built with.
    pub fn from_index(
        index: CorpusIndex,
        directory: InstituteDirectory,
        stopwords: Stopwords,
        config: EngineConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        let directory = Arc::new(directory);
        let config = Arc::new(config);
        let next_generation = AtomicU64::new(index.generation() + 1);
        let snapshot = Snapshot::new(index, stopwords, Arc::clone(&directory), Arc::clone(&config), Arc::clone(&tokenizer));
        info!("serving generation {}", snapshot.generation());
        Self {
            tokenizer,
            directory,
            config,
            current: RwLock::new(Arc::new(snapshot)),
            rebuild: Mutex::new(()),
            next_generation,
        }
    }

    /// The snapshot to serve one request from.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn directory(&self) -> &InstituteDirectory {
        &self.directory
    }

    /// Current stopword set.
    pub fn stopwords(&self) -> Stopwords {
        self.snapshot().stopwords().clone()
    }

    /// Replace the stopword set and rebuild. Returns the published generation.
    pub fn invalidate(&self, stopwords: Stopwords) -> Result<u64> {
        self.rebuild_with(|_| stopwords)
    }

    pub fn add_stopwords<I, S>(&self, words: I) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rebuild_with(|current| {
            let mut next = current.clone();
            for word in words {
                next.insert(word.as_ref());
            }
            next
        })
    }

    pub fn remove_stopwords<I, S>(&self, words: I) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rebuild_with(|current| {
            let mut next = current.clone();
            for word in words {
                next.remove(word.as_ref());
            }
            next
        })
    }

    fn rebuild_with<F>(&self, derive: F) -> Result<u64>
    where
        F: FnOnce(&Stopwords) -> Stopwords,
    {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.snapshot();
        let stopwords = derive(previous.stopwords());
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        let index = match CorpusIndex::build(previous.index().reports_arc(), &stopwords, &*self.tokenizer, generation) {
            Ok(index) => index,
            Err(e) => {
                error!(
                    "rebuild of generation {generation} failed, still serving generation {}: {e}",
                    previous.generation()
                );
                return Err(e);
            }
        };
        let snapshot = Arc::new(Snapshot::new(
            index,
            stopwords,
            Arc::clone(&self.directory),
            Arc::clone(&self.config),
            Arc::clone(&self.tokenizer),
        ));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        info!("published generation {generation} (replaced {})", previous.generation());
        Ok(generation)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("current", &self.snapshot()).finish()
    }
}
