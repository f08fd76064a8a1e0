//! Researcher profiles aggregated from report bylines.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;

use ahash::RandomState;
use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ResearcherConfig;
use crate::corpus::institute::InstituteDirectory;
use crate::corpus::{ReportRef, Scope, ScopeFilter};
use crate::index::CorpusIndex;
use crate::researcher::expand::CooccurrenceMap;
use crate::researcher::tfidf::{DefaultTfIdfEngine, IdfTable, TfIdfEngine};
use crate::utils::scaler::concentration;
use crate::utils::sparse::SparseVec;

/// Identity of a profile: lowercased author name plus institute.
///
/// Two people sharing a name at different institutes are different profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileKey {
    pub name: String,
    pub institute: String,
}

impl ProfileKey {
    pub fn new(name: &str, institute: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            institute: institute.trim().to_string(),
        }
    }
}

/// A keyword and its TF-IDF weight inside one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearcherProfile {
    pub key: ProfileKey,
    /// Name as first seen in a byline.
    pub name: String,
    pub institute: String,
    pub groups: BTreeSet<String>,
    pub scopes: BTreeSet<Scope>,
    /// Distinct reports listing this author.
    pub report_count: u64,
    pub last_active_year: Option<i32>,
    /// keyword -> number of the profile's reports carrying it
    pub keyword_counts: IndexMap<String, u64, RandomState>,
    /// Newest first, undated last.
    pub recent_reports: Vec<ReportRef>,
    /// Distinct co-author names across the whole scope, by name only.
    pub co_author_degree: u64,
    /// Expertise tags, heaviest first.
    pub tags: Vec<KeywordWeight>,
    /// 1 for a specialist, 0 for an even spread.
    pub focus: f64,
    /// Unit TF-IDF vector over the model vocabulary.
    #[serde(skip)]
    pub vector: SparseVec<f32>,
}

impl ResearcherProfile {
    pub fn has_tag(&self, keyword: &str) -> bool {
        self.tags.iter().any(|t| t.keyword == keyword)
    }
}

/// Profiles of one scope with their IDF table and expansion map.
#[derive(Debug, Clone)]
pub struct ResearcherModel<E = DefaultTfIdfEngine>
where
    E: TfIdfEngine,
{
    scope: ScopeFilter,
    generation: u64,
    profiles: Vec<ResearcherProfile>,
    lookup: HashMap<ProfileKey, usize, RandomState>,
    /// lowercased name -> lowercased co-author names
    collaborators: HashMap<String, BTreeSet<String>, RandomState>,
    idf: IdfTable,
    cooccurrence: CooccurrenceMap,
    _marker: PhantomData<E>,
}

/// Per-profile accumulator while walking the reports.
struct Draft<'a> {
    name: &'a str,
    institute: &'a str,
    groups: BTreeSet<String>,
    scopes: BTreeSet<Scope>,
    report_ids: HashSet<&'a str, RandomState>,
    last_active_year: Option<i32>,
    keyword_counts: IndexMap<String, u64, RandomState>,
    rows: Vec<usize>,
}

impl<E> ResearcherModel<E>
where
    E: TfIdfEngine + Send + Sync,
{
    /// Aggregate the reports of `scope` into profiles.
    pub fn build(index: &CorpusIndex, directory: &InstituteDirectory, scope: ScopeFilter, config: &ResearcherConfig) -> Self {
        let rows: Vec<usize> = index
            .reports()
            .iter()
            .enumerate()
            .filter(|(_, r)| scope.contains(r.scope))
            .map(|(row, _)| row)
            .collect();

        let mut drafts: IndexMap<ProfileKey, Draft<'_>, RandomState> = IndexMap::default();
        let mut collaborators: HashMap<String, BTreeSet<String>, RandomState> = HashMap::default();

        for &row in &rows {
            let (Some(report), Some(tokens)) = (index.report(row), index.tokens(row)) else {
                continue;
            };
            let authors = distinct_authors(&report.authors);
            for (i, (name, lower)) in authors.iter().enumerate() {
                let name: &str = name;
                for (_, other) in &authors[i + 1..] {
                    collaborators.entry(lower.clone()).or_default().insert(other.clone());
                    collaborators.entry(other.clone()).or_default().insert(lower.clone());
                }

                let draft = drafts.entry(ProfileKey::new(name, &report.institute)).or_insert_with(|| Draft {
                    name,
                    institute: report.institute.trim(),
                    groups: BTreeSet::new(),
                    scopes: BTreeSet::new(),
                    report_ids: HashSet::default(),
                    last_active_year: None,
                    keyword_counts: IndexMap::default(),
                    rows: Vec::new(),
                });
                draft.scopes.insert(report.scope);
                if let Some(group) = directory.resolve_group(&report.institute, report.scope) {
                    draft.groups.insert(group.to_string());
                }
                if !draft.report_ids.insert(report.id.as_str()) {
                    continue;
                }
                draft.last_active_year = draft.last_active_year.max(report.year);
                for kw in &tokens.set {
                    *draft.keyword_counts.entry(kw.clone()).or_insert(0) += 1;
                }
                draft.rows.push(row);
            }
        }

        let mut doc_freq: IndexMap<&str, u64, RandomState> = IndexMap::default();
        for draft in drafts.values() {
            for kw in draft.keyword_counts.keys() {
                *doc_freq.entry(kw.as_str()).or_insert(0) += 1;
            }
        }
        let idf = IdfTable::build::<E, _, _>(drafts.len() as u64, doc_freq);

        let drafts: Vec<(ProfileKey, Draft<'_>)> = drafts.into_iter().collect();
        let profiles: Vec<ResearcherProfile> = drafts
            .into_par_iter()
            .map(|(key, draft)| {
                let degree = collaborators.get(&key.name).map_or(0, |c| c.len() as u64);
                finish_profile::<E>(key, draft, degree, index, &idf, config)
            })
            .collect();

        let lookup = profiles.iter().enumerate().map(|(i, p)| (p.key.clone(), i)).collect();
        let cooccurrence = CooccurrenceMap::build(rows.iter().filter_map(|&row| index.tokens(row)), config.expansion_vocab);

        debug!(
            "built researcher model for scope {} (generation {}): {} profiles, {} keywords",
            scope.as_str(),
            index.generation(),
            profiles.len(),
            idf.vocab_size()
        );

        Self {
            scope,
            generation: index.generation(),
            profiles,
            lookup,
            collaborators,
            idf,
            cooccurrence,
            _marker: PhantomData,
        }
    }
}

impl<E> ResearcherModel<E>
where
    E: TfIdfEngine,
{
    pub fn scope(&self) -> ScopeFilter {
        self.scope
    }

    /// Generation of the index this model was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Profiles in first-seen order.
    pub fn profiles(&self) -> &[ResearcherProfile] {
        &self.profiles
    }

    pub fn profile(&self, key: &ProfileKey) -> Option<&ResearcherProfile> {
        self.lookup.get(key).and_then(|&i| self.profiles.get(i))
    }

    /// Co-author names of `name` across every institute, sorted.
    pub fn collaborators(&self, name: &str) -> Vec<String> {
        self.collaborators
            .get(&name.trim().to_lowercase())
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn idf(&self) -> &IdfTable {
        &self.idf
    }

    pub fn cooccurrence(&self) -> &CooccurrenceMap {
        &self.cooccurrence
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Trimmed, non-empty byline names, each once (case-insensitive), with their lowercase form.
fn distinct_authors(authors: &[String]) -> Vec<(&str, String)> {
    let mut seen: HashSet<String, RandomState> = HashSet::default();
    authors
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .filter_map(|a| {
            let lower = a.to_lowercase();
            seen.insert(lower.clone()).then_some((a, lower))
        })
        .collect()
}

fn finish_profile<E: TfIdfEngine>(
    key: ProfileKey,
    draft: Draft<'_>,
    co_author_degree: u64,
    index: &CorpusIndex,
    idf: &IdfTable,
    config: &ResearcherConfig,
) -> ResearcherProfile {
    let mut weights: Vec<(u32, f64)> = draft
        .keyword_counts
        .iter()
        .filter_map(|(kw, &count)| {
            let dim = idf.dim(kw)?;
            Some((dim, E::tf(count) * idf.idf_at(dim)))
        })
        .collect();
    // stable: equal weights keep first-seen order
    weights.sort_by(|a, b| b.1.total_cmp(&a.1));

    let tags = weights
        .iter()
        .take(config.tag_top_k)
        .filter_map(|&(dim, weight)| {
            Some(KeywordWeight {
                keyword: idf.term(dim)?.to_string(),
                weight,
            })
        })
        .collect();
    let vector = SparseVec::from_pairs(
        weights
            .iter()
            .take(config.vector_top_k)
            .map(|&(dim, w)| (dim, w as f32))
            .collect(),
    )
    .normalized();

    let mut rows = draft.rows;
    rows.sort_by(|&a, &b| {
        let ya = index.report(a).and_then(|r| r.year);
        let yb = index.report(b).and_then(|r| r.year);
        // None sorts below any year, so reverse order puts undated last
        yb.cmp(&ya)
    });
    let recent_reports = rows
        .iter()
        .filter_map(|&row| index.report(row))
        .take(config.recent_reports)
        .map(ReportRef::from)
        .collect();

    ResearcherProfile {
        key,
        name: draft.name.to_string(),
        institute: draft.institute.to_string(),
        groups: draft.groups,
        scopes: draft.scopes,
        report_count: draft.report_ids.len() as u64,
        last_active_year: draft.last_active_year,
        focus: concentration(draft.keyword_counts.values().copied()),
        keyword_counts: draft.keyword_counts,
        recent_reports,
        co_author_degree,
        tags,
        vector,
    }
}
