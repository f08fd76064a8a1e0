//! This crate is a corpus analytics and researcher matching engine for research-report collections.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod researcher;
pub mod token;
pub mod utils;

/// Engine
/// The top-level struct of this crate. It owns the report corpus, the institute
/// directory and the configuration, and serves every request from an immutable
/// `Snapshot`.
///
/// A snapshot holds:
/// - The corpus index for the current stopword set
/// - The stopword set itself
/// - Lazily built researcher models, one per scope
/// - A result cache tagged with the index generation
///
/// # Mutation
/// The only mutation is a stopword change (`invalidate`, `add_stopwords`,
/// `remove_stopwords`). It rebuilds a complete snapshot and swaps it in; readers
/// holding the previous snapshot finish on it undisturbed.
///
/// # Thread Safety
/// `Engine` and `Snapshot` are `Send + Sync`. Reads never wait on a rebuild.
pub use engine::{Engine, Snapshot};

/// Corpus Index
/// Per-report token sets plus keyword, keyword-by-year and institute counts.
/// Built in one pass from the reports and a stopword set; a keyword counts once
/// per report no matter how often the title repeats it.
///
/// # Serialization
/// Supported, via CBOR (`to_cbor` / `from_cbor`) for a warm start.
pub use index::CorpusIndex;

/// Filter and Filtered View
/// - `Filter`: raw request fields (scope, institute, year, free text)
/// - `ResolvedFilter`: the normalized form, hashable, used as the cache key
/// - `FilteredView`: the selected rows of an index that every aggregation runs on
pub use filter::{Filter, FilteredView, ResolvedFilter};

/// Report records and scopes
pub use corpus::{Report, ReportRef, Scope, ScopeFilter};

/// Institute metadata, used to resolve council-group codes (`NRC`, `NCT`)
pub use corpus::institute::{Institute, InstituteDirectory};

/// Tokenizer Trait
/// Plug any segmentation into the engine by implementing `Tokenizer`.
/// `SimpleTokenizer` splits on non-alphanumeric characters and lowercases.
pub use token::{SimpleTokenizer, Stopwords, Tokenizer};

/// Researcher search
/// Profiles keyed by (name, institute), TF-IDF vectors, co-occurrence query
/// expansion and an explainable multi-signal ranking.
pub use researcher::{ProfileKey, ResearcherModel, SearchPage, SearchRequest, SortMode};

/// Configuration
pub use config::EngineConfig;

/// Error and Result
pub use error::{Error, Result};
