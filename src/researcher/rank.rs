//! Researcher search: query expansion, vector scoring and explainable ranking.

use std::cmp::Ordering;
use std::fmt;

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ResearcherConfig;
use crate::corpus::ReportRef;
use crate::error::{Error, Result};
use crate::researcher::expand::Expansion;
use crate::researcher::model::{KeywordWeight, ProfileKey, ResearcherModel, ResearcherProfile};
use crate::researcher::tfidf::TfIdfEngine;
use crate::token::{Stopwords, TermFrequency, Tokenizer};
use crate::utils::scaler::rescale01;

const W_SIMILARITY: f64 = 7.0;
const W_COVERAGE: f64 = 2.0;
const W_PRODUCTIVITY: f64 = 0.55;
const W_RECENCY: f64 = 0.03;
const W_COLLAB: f64 = 0.25;
const W_FOCUS: f64 = 0.35;

const EXACT_NAME_BOOST: f64 = 3.0;
const PARTIAL_NAME_BOOST: f64 = 1.6;

const RECENCY_BASE_YEAR: i32 = 2000;

/// Result ordering of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Blended relevance score.
    #[default]
    Relevance,
    /// Display confidence, then similarity, then score.
    Match,
    /// Last active year.
    Recent,
    /// Report count.
    Outputs,
}

impl SortMode {
    /// `ai` is an alias of `match`; anything unknown is `relevance`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "match" | "ai" => SortMode::Match,
            "recent" => SortMode::Recent,
            "outputs" => SortMode::Outputs,
            _ => SortMode::Relevance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Relevance => "relevance",
            SortMode::Match => "match",
            SortMode::Recent => "recent",
            SortMode::Outputs => "outputs",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Institute name, trimmed and case-insensitive.
    pub institute: Option<String>,
    pub sort: SortMode,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            institute: None,
            sort: SortMode::Relevance,
            limit: 20,
            offset: 0,
        }
    }
}

impl SearchRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn institute(mut self, institute: &str) -> Self {
        let institute = institute.trim().to_lowercase();
        self.institute = (!institute.is_empty()).then_some(institute);
        self
    }

    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Raw ranking signals of one profile against one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub similarity: f64,
    pub coverage: f64,
    pub productivity: f64,
    pub recency: f64,
    pub collab: f64,
    pub focus: f64,
    pub name_boost: f64,
}

impl Signals {
    pub fn score(&self) -> f64 {
        W_SIMILARITY * self.similarity
            + W_COVERAGE * self.coverage
            + W_PRODUCTIVITY * self.productivity
            + W_RECENCY * self.recency
            + W_COLLAB * self.collab
            + W_FOCUS * self.focus
            + self.name_boost
    }

    /// Display confidence in `[0, 1]`, calibrated separately from the score.
    pub fn confidence(&self) -> f64 {
        0.65 * rescale01(self.similarity, 0.05, 0.55)
            + 0.25 * rescale01(self.coverage, 0.1, 0.8)
            + 0.10 * rescale01(self.productivity, 0.5, 2.5)
    }

    fn exact_name(&self) -> bool {
        self.name_boost >= EXACT_NAME_BOOST
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResearcher {
    pub key: ProfileKey,
    pub name: String,
    pub institute: String,
    pub groups: Vec<String>,
    pub score: f64,
    pub confidence: f64,
    pub signals: Signals,
    pub report_count: u64,
    pub last_active_year: Option<i32>,
    pub tags: Vec<KeywordWeight>,
    /// Query terms, expanded ones included, found in the profile's keywords.
    pub matched_keywords: Vec<String>,
    pub recent_reports: Vec<ReportRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstituteFacet {
    pub institute: String,
    pub count: u64,
}

/// How the query was read, for display next to the results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub base_tokens: Vec<String>,
    pub expanded_tokens: Vec<String>,
    pub expansions: Vec<Expansion>,
    pub suggested_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Matches before paging.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub items: Vec<RankedResearcher>,
    /// Per-institute counts over all matches.
    pub facets: Vec<InstituteFacet>,
    pub query: QueryAnalysis,
}

/// Rank the profiles of `model` against `request`.
///
/// A query that leaves no tokens after stopword removal ranks every profile by
/// the non-query signals. Otherwise profiles with no similarity, no coverage and
/// no name match are dropped.
pub fn search<E, T>(
    model: &ResearcherModel<E>,
    tokenizer: &T,
    stopwords: &Stopwords,
    request: &SearchRequest,
    config: &ResearcherConfig,
) -> Result<SearchPage>
where
    E: TfIdfEngine,
    T: Tokenizer + ?Sized,
{
    let base_tokens = tokenizer
        .tokenize(&request.query, stopwords)
        .map_err(|e| Error::Query { message: e.0 })?;
    let expansion = model
        .cooccurrence()
        .expand(&base_tokens, config.expansion_per_token, config.expansion_max_terms);

    let mut freq = TermFrequency::new();
    freq.add_terms(&expansion.expanded);
    let query_vec = model.idf().query_vector::<E>(&freq);

    let coverage_terms: IndexSet<&str, RandomState> = if base_tokens.is_empty() {
        expansion.expanded.iter().map(String::as_str).collect()
    } else {
        base_tokens.iter().map(String::as_str).collect()
    };
    let query_terms: IndexSet<&str, RandomState> = expansion.expanded.iter().map(String::as_str).collect();
    let open_query = query_vec.is_empty() && coverage_terms.is_empty();
    let institute = request.institute.as_deref().map(|i| i.trim().to_lowercase());

    let mut hits: Vec<(&ResearcherProfile, Signals)> = model
        .profiles()
        .par_iter()
        .filter(|p| institute.as_deref().map_or(true, |i| p.institute.to_lowercase() == i))
        .map(|p| {
            let signals = Signals {
                similarity: if query_vec.is_empty() { 0.0 } else { query_vec.cosine(&p.vector) },
                coverage: coverage(p, &coverage_terms),
                productivity: (1.0 + p.report_count as f64).ln(),
                recency: p.last_active_year.map_or(0.0, |y| f64::from(y) - f64::from(RECENCY_BASE_YEAR)),
                collab: (1.0 + p.co_author_degree as f64).ln(),
                focus: p.focus,
                name_boost: name_boost(&p.name, &request.query),
            };
            (p, signals)
        })
        .filter(|(_, s)| open_query || s.similarity > 0.0 || s.coverage > 0.0 || s.name_boost > 0.0)
        .collect();

    sort_hits(&mut hits, request.sort);

    let mut facets: IndexMap<&str, u64, RandomState> = IndexMap::default();
    for (p, _) in &hits {
        *facets.entry(p.institute.as_str()).or_insert(0) += 1;
    }
    facets.sort_by(|ka, a, kb, b| b.cmp(a).then_with(|| ka.cmp(kb)));

    let total = hits.len();
    let items = hits
        .into_iter()
        .skip(request.offset)
        .take(request.limit)
        .map(|(p, s)| ranked(p, s, &query_terms))
        .collect();

    Ok(SearchPage {
        total,
        offset: request.offset,
        limit: request.limit,
        items,
        facets: facets
            .into_iter()
            .map(|(institute, count)| InstituteFacet { institute: institute.to_string(), count })
            .collect(),
        query: QueryAnalysis {
            suggested_keywords: expansion.suggestions(),
            base_tokens: expansion.base,
            expanded_tokens: expansion.expanded,
            expansions: expansion.pairs,
        },
    })
}

/// Share of `terms` among the profile's expertise tags.
fn coverage(profile: &ResearcherProfile, terms: &IndexSet<&str, RandomState>) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let hit = terms.iter().filter(|t| profile.has_tag(t)).count();
    hit as f64 / terms.len() as f64
}

/// Lowercase with all whitespace removed.
fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// Exact boost when the squashed forms are equal; partial when the query is part
/// of the name or the name spans whole words of the query.
fn name_boost(name: &str, query: &str) -> f64 {
    let name = squash(name);
    let squashed = squash(query);
    if name.is_empty() || squashed.is_empty() {
        0.0
    } else if name == squashed {
        EXACT_NAME_BOOST
    } else if name.contains(&squashed) || spans_words(&name, query) {
        PARTIAL_NAME_BOOST
    } else {
        0.0
    }
}

/// Whether `name` equals a run of consecutive whitespace-separated words of `query`.
fn spans_words(name: &str, query: &str) -> bool {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    (0..words.len()).any(|start| {
        let mut run = String::new();
        words[start..].iter().any(|w| {
            run.push_str(w);
            run == name
        })
    })
}

fn sort_hits(hits: &mut [(&ResearcherProfile, Signals)], mode: SortMode) {
    hits.sort_by(|(pa, a), (pb, b)| {
        let primary = match mode {
            SortMode::Relevance => b.exact_name().cmp(&a.exact_name()).then_with(|| b.score().total_cmp(&a.score())),
            SortMode::Match => b
                .exact_name()
                .cmp(&a.exact_name())
                .then_with(|| b.confidence().total_cmp(&a.confidence()))
                .then_with(|| b.similarity.total_cmp(&a.similarity))
                .then_with(|| b.score().total_cmp(&a.score())),
            SortMode::Recent => pb.last_active_year.cmp(&pa.last_active_year),
            SortMode::Outputs => pb.report_count.cmp(&pa.report_count),
        };
        primary.then_with(|| tie_break(pa, pb))
    });
}

fn tie_break(a: &ResearcherProfile, b: &ResearcherProfile) -> Ordering {
    a.key.cmp(&b.key)
}

fn ranked(profile: &ResearcherProfile, signals: Signals, query_terms: &IndexSet<&str, RandomState>) -> RankedResearcher {
    RankedResearcher {
        key: profile.key.clone(),
        name: profile.name.clone(),
        institute: profile.institute.clone(),
        groups: profile.groups.iter().cloned().collect(),
        score: signals.score(),
        confidence: signals.confidence(),
        signals,
        report_count: profile.report_count,
        last_active_year: profile.last_active_year,
        tags: profile.tags.clone(),
        matched_keywords: query_terms
            .iter()
            .filter(|t| profile.keyword_counts.contains_key(**t))
            .map(|t| t.to_string())
            .collect(),
        recent_reports: profile.recent_reports.clone(),
    }
}

/// Full record of one researcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearcherDetail {
    pub profile: ResearcherProfile,
    /// Co-author names, lowercased, across every institute.
    pub collaborators: Vec<String>,
}

/// Look up a single profile with its collaborators.
pub fn researcher<E: TfIdfEngine>(model: &ResearcherModel<E>, key: &ProfileKey) -> Option<ResearcherDetail> {
    let profile = model.profile(key)?;
    Some(ResearcherDetail {
        collaborators: model.collaborators(&profile.key.name),
        profile: profile.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarResearcher {
    pub key: ProfileKey,
    pub name: String,
    pub institute: String,
    pub similarity: f64,
    pub shared_tags: Vec<String>,
}

/// Other profiles closest to `key` by vector cosine, most similar first.
/// Empty when the key is unknown.
pub fn similar_researchers<E: TfIdfEngine>(model: &ResearcherModel<E>, key: &ProfileKey, limit: usize) -> Vec<SimilarResearcher> {
    let Some(target) = model.profile(key) else {
        return Vec::new();
    };
    let mut hits: Vec<(&ResearcherProfile, f64)> = model
        .profiles()
        .par_iter()
        .filter(|p| p.key != target.key)
        .map(|p| (p, target.vector.cosine(&p.vector)))
        .filter(|(_, sim)| *sim > 0.0)
        .collect();
    hits.sort_by(|(pa, a), (pb, b)| b.total_cmp(a).then_with(|| tie_break(pa, pb)));
    hits.truncate(limit);
    hits.into_iter()
        .map(|(p, similarity)| SimilarResearcher {
            key: p.key.clone(),
            name: p.name.clone(),
            institute: p.institute.clone(),
            similarity,
            shared_tags: target
                .tags
                .iter()
                .filter(|t| p.has_tag(&t.keyword))
                .map(|t| t.keyword.clone())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::institute::InstituteDirectory;
    use crate::corpus::{Scope, ScopeFilter};
    use crate::index::tests::sample_index;
    use crate::token::SimpleTokenizer;

    fn model() -> ResearcherModel {
        ResearcherModel::build(&sample_index(), &InstituteDirectory::new(), ScopeFilter::All, &ResearcherConfig::default())
    }

    fn run(model: &ResearcherModel, request: SearchRequest) -> SearchPage {
        search(model, &SimpleTokenizer::default(), &Stopwords::new(), &request, &ResearcherConfig::default()).unwrap()
    }

    fn names(page: &SearchPage) -> Vec<(String, String)> {
        page.items.iter().map(|i| (i.name.clone(), i.institute.clone())).collect()
    }

    #[test]
    fn sort_mode_aliases() {
        assert_eq!(SortMode::parse("AI"), SortMode::Match);
        assert_eq!(SortMode::parse("outputs"), SortMode::Outputs);
        assert_eq!(SortMode::parse("whatever"), SortMode::Relevance);
    }

    #[test]
    fn topical_query_ranks_topical_profiles_first() {
        let m = model();
        let page = run(&m, SearchRequest::new("grid storage"));
        assert_eq!(page.items[0].name, "Park C");
        assert!(page.items[0].signals.similarity > 0.5);
        assert_eq!(page.items[0].signals.coverage, 1.0);
        assert!(page.items[0].matched_keywords.contains(&"grid".to_string()));
        // City Institute profiles share nothing with the query or its expansion
        assert!(page.items.iter().all(|i| i.institute != "City Institute"));
        assert_eq!(page.total, page.items.len());
    }

    #[test]
    fn empty_query_keeps_everyone_with_zero_similarity() {
        let m = model();
        let page = run(&m, SearchRequest::new(""));
        assert_eq!(page.total, m.len());
        assert!(page.items.iter().all(|i| i.signals.similarity == 0.0 && i.signals.coverage == 0.0));
        assert!(page.items.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(page.query.base_tokens.is_empty());
    }

    #[test]
    fn exact_name_leads_under_relevance_and_match() {
        let m = model();
        for sort in [SortMode::Relevance, SortMode::Match] {
            let page = run(&m, SearchRequest::new("choi d").sort(sort));
            assert_eq!(page.items[0].name, "Choi D", "{sort}");
            assert_eq!(page.items[0].signals.name_boost, EXACT_NAME_BOOST);
        }
        let page = run(&m, SearchRequest::new("  KIMA "));
        assert_eq!(page.items[0].name, "Kim A");
        assert_eq!(page.items[1].name, "Kim A");
    }

    #[test]
    fn stopword_only_query_ranks_everyone() {
        let m = model();
        let stopwords: Stopwords = ["the"].into_iter().collect();
        let tokenizer = SimpleTokenizer::default();
        let config = ResearcherConfig::default();
        for query in ["the", "??", " the ! "] {
            let page = search(&m, &tokenizer, &stopwords, &SearchRequest::new(query), &config).unwrap();
            assert!(page.query.base_tokens.is_empty(), "{query}");
            assert_eq!(page.total, m.len(), "{query}");
        }
    }

    #[test]
    fn unknown_tokens_still_filter() {
        let m = model();
        assert_eq!(run(&m, SearchRequest::new("zebra")).total, 0);
    }

    #[test]
    fn partial_name_needs_whole_query_words() {
        assert_eq!(name_boost("Li", "policy"), 0.0);
        assert_eq!(name_boost("Li", "urban policy"), 0.0);
        assert_eq!(name_boost("Li", "li urban"), PARTIAL_NAME_BOOST);
        assert_eq!(name_boost("Kim A", "grid kim a"), PARTIAL_NAME_BOOST);
        assert_eq!(name_boost("Kim A", "KIM"), PARTIAL_NAME_BOOST);
        assert_eq!(name_boost("Kim A", " kim  a "), EXACT_NAME_BOOST);
        assert_eq!(name_boost("Kim A", "  "), 0.0);
    }

    #[test]
    fn extreme_years_do_not_overflow_recency() {
        use crate::index::tests::report;
        use std::sync::Arc;

        let reports = vec![
            report("1", Some(i32::MIN), "Grid storage", "Energy Lab", Scope::National, &["Kim A"]),
            report("2", Some(i32::MAX), "Grid policy", "Energy Lab", Scope::National, &["Park C"]),
        ];
        let index = crate::index::CorpusIndex::build(Arc::new(reports), &Stopwords::new(), &SimpleTokenizer::default(), 1).unwrap();
        let m = ResearcherModel::build(&index, &InstituteDirectory::new(), ScopeFilter::All, &ResearcherConfig::default());
        let page = run(&m, SearchRequest::new(""));
        assert_eq!(page.total, 2);
        let recency: Vec<f64> = page.items.iter().map(|i| i.signals.recency).collect();
        assert!(recency.contains(&(f64::from(i32::MIN) - 2000.0)));
        assert!(recency.contains(&(f64::from(i32::MAX) - 2000.0)));
        assert!(page.items.iter().all(|i| i.score.is_finite()));
    }

    #[test]
    fn institute_filter_and_facets() {
        let m = model();
        let page = run(&m, SearchRequest::new("").institute(" energy LAB"));
        assert_eq!(page.total, 2);
        assert_eq!(page.facets, vec![InstituteFacet { institute: "Energy Lab".into(), count: 2 }]);
        assert_eq!(run(&m, SearchRequest::new("").institute("Nowhere")).total, 0);

        let all = run(&m, SearchRequest::new(""));
        assert_eq!(all.facets[0], InstituteFacet { institute: "City Institute".into(), count: 2 });
        assert_eq!(all.facets.iter().map(|f| f.count).sum::<u64>(), 5);
    }

    #[test]
    fn paging_slices_after_sorting() {
        let m = model();
        let full = run(&m, SearchRequest::new("").sort(SortMode::Outputs));
        let page = run(&m, SearchRequest::new("").sort(SortMode::Outputs).page(2, 1));
        assert_eq!(page.total, full.total);
        assert_eq!(names(&page), names(&full)[1..3].to_vec());
        assert_eq!(full.items[0].report_count, 2);
    }

    #[test]
    fn recent_sort_puts_undated_last() {
        let m = model();
        let page = run(&m, SearchRequest::new("").sort(SortMode::Recent));
        assert_eq!(page.items[0].name, "Park C");
        assert_eq!(page.items.last().map(|i| i.name.as_str()), Some("Choi D"));
    }

    #[test]
    fn ranking_is_deterministic() {
        let m = model();
        let req = SearchRequest::new("urban policy");
        let first = run(&m, req.clone());
        for _ in 0..5 {
            let again = run(&m, req.clone());
            assert_eq!(names(&again), names(&first));
            assert_eq!(again.total, first.total);
        }
    }

    #[test]
    fn expansion_is_reported() {
        let m = model();
        let page = run(&m, SearchRequest::new("grid"));
        assert_eq!(page.query.base_tokens, vec!["grid"]);
        assert!(page.query.expanded_tokens.len() > 1);
        assert_eq!(page.query.expansions[0].from, "grid");
        assert_eq!(page.query.expansions[0].to, "storage");
        assert!(page.query.suggested_keywords.contains(&"storage".to_string()));
    }

    #[test]
    fn confidence_is_bounded() {
        let s = Signals { similarity: 2.0, coverage: 2.0, productivity: 9.0, ..Signals::default() };
        assert!((s.confidence() - 1.0).abs() < 1e-12);
        assert_eq!(Signals::default().confidence(), 0.0);
    }

    #[test]
    fn similar_researchers_share_topics() {
        let m = model();
        let key = ProfileKey::new("Park C", "Energy Lab");
        let similar = similar_researchers(&m, &key, 3);
        assert_eq!(similar[0].key, ProfileKey::new("Kim A", "Energy Lab"));
        assert!(similar.iter().all(|s| s.key != key && (0.0..=1.0).contains(&s.similarity)));
        assert!(similar_researchers(&m, &ProfileKey::new("nobody", "x"), 3).is_empty());
    }

    #[test]
    fn detail_lists_collaborators() {
        let m = model();
        let detail = researcher(&m, &ProfileKey::new("Park C", "Energy Lab")).unwrap();
        assert_eq!(detail.profile.report_count, 2);
        assert_eq!(detail.collaborators, vec!["kim a"]);
    }
}
