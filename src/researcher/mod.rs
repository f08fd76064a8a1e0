//! Researcher matching.
//!
//! Authors are aggregated per (name, institute) into profiles carrying a
//! TF-IDF vector over their report keywords. Queries are expanded through
//! title co-occurrence and scored against every profile with a fixed linear
//! blend of signals that is returned alongside each hit.

pub mod expand;
pub mod model;
pub mod rank;
pub mod tfidf;

pub use expand::{CooccurrenceMap, Expansion, QueryExpansion};
pub use model::{KeywordWeight, ProfileKey, ResearcherModel, ResearcherProfile};
pub use rank::{
    researcher, search, similar_researchers, InstituteFacet, QueryAnalysis, RankedResearcher, ResearcherDetail,
    SearchPage, SearchRequest, Signals, SimilarResearcher, SortMode,
};
pub use tfidf::{DefaultTfIdfEngine, IdfTable, TfIdfEngine};
