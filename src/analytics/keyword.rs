use std::collections::BTreeMap;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analytics::{dense_series, ranked_keywords, top_keywords, yearly_counts, KeywordCount, YearCount};
use crate::corpus::{ReportRef, Scope};
use crate::error::{Error, Result};
use crate::filter::FilteredView;
use crate::index::CorpusIndex;

/// Reports per institute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstituteCount {
    pub institute: String,
    pub count: u64,
}

/// Keyword frequency table plus the year and institute breakdown of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordStats {
    pub total: usize,
    pub keywords: Vec<KeywordCount>,
    pub years: Vec<YearCount>,
    pub institutes: Vec<InstituteCount>,
}

pub fn keyword_stats(view: &FilteredView<'_>, top: usize) -> KeywordStats {
    let keywords = top_keywords(view, top)
        .into_iter()
        .map(|(k, c)| KeywordCount { keyword: k.to_string(), count: c })
        .collect();

    let mut years: BTreeMap<i32, u64> = BTreeMap::new();
    let mut institutes: IndexMap<&str, u64, RandomState> = IndexMap::default();
    for (report, _) in view.iter() {
        if let Some(year) = report.year {
            *years.entry(year).or_insert(0) += 1;
        }
        *institutes.entry(report.institute.as_str()).or_insert(0) += 1;
    }
    institutes.sort_by(|_, a, _, b| b.cmp(a));

    KeywordStats {
        total: view.len(),
        keywords,
        years: years.into_iter().map(|(year, count)| YearCount { year, count }).collect(),
        institutes: institutes
            .into_iter()
            .map(|(i, c)| InstituteCount { institute: i.to_string(), count: c })
            .collect(),
    }
}

/// Yearly counts of one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSeries {
    /// Keyword as requested.
    pub keyword: String,
    /// Indexed keyword it resolved to, if any.
    pub resolved: Option<String>,
    pub points: Vec<YearCount>,
}

/// Per-year counts of `keyword` over the view's years.
///
/// The keyword is resolved against the index vocabulary literally, then
/// lowercased, then with whitespace and punctuation stripped. An unresolved
/// keyword yields a zero series.
pub fn keyword_series(view: &FilteredView<'_>, keyword: &str) -> Result<KeywordSeries> {
    if keyword.trim().is_empty() {
        return Err(Error::MissingParameter { name: "keyword" });
    }
    let resolved = resolve_keyword(view.index(), keyword);
    let years = view.years();
    let counts = match resolved.as_deref() {
        Some(kw) => dense_series(yearly_counts(view, &[kw]).get(kw), &years),
        None => vec![0; years.len()],
    };
    Ok(KeywordSeries {
        keyword: keyword.to_string(),
        resolved,
        points: years
            .into_iter()
            .zip(counts)
            .map(|(year, count)| YearCount { year, count })
            .collect(),
    })
}

fn resolve_keyword(index: &CorpusIndex, keyword: &str) -> Option<String> {
    let vocab = index.keyword_counts();
    if vocab.contains_key(keyword) {
        return Some(keyword.to_string());
    }
    let lower = keyword.trim().to_lowercase();
    if vocab.contains_key(lower.as_str()) {
        return Some(lower);
    }
    let wanted = squash(keyword);
    if wanted.is_empty() {
        return None;
    }
    // most frequent candidate wins, first seen on ties
    let mut best: Option<(&String, u64)> = None;
    for (kw, &count) in vocab {
        if squash(kw) == wanted && best.map_or(true, |(_, c)| count > c) {
            best = Some((kw, count));
        }
    }
    best.map(|(kw, _)| kw.clone())
}

/// Lowercase and drop everything that is not alphanumeric.
fn squash(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// Series of several keywords over a shared year axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub years: Vec<i32>,
    pub series: Vec<SeriesLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLine {
    pub keyword: String,
    pub counts: Vec<u64>,
}

/// Yearly series of the five most frequent keywords.
pub fn top5_trends(view: &FilteredView<'_>) -> TrendSeries {
    let keywords: Vec<&str> = top_keywords(view, 5).into_iter().map(|(k, _)| k).collect();
    let years = view.years();
    let table = yearly_counts(view, &keywords);
    let series = keywords
        .iter()
        .map(|kw| SeriesLine {
            keyword: kw.to_string(),
            counts: dense_series(table.get(*kw), &years),
        })
        .collect();
    TrendSeries { years, series }
}

/// The `top` most frequent keywords for a size-by-frequency cloud.
pub fn word_cloud(view: &FilteredView<'_>, top: usize) -> Vec<KeywordCount> {
    ranked_keywords(view)
        .into_iter()
        .take(top)
        .map(|(k, c)| KeywordCount { keyword: k.to_string(), count: c })
        .collect()
}

/// Reports of the view whose title carries `keyword`, newest first.
pub fn related_reports(view: &FilteredView<'_>, keyword: &str, limit: usize) -> Result<Vec<ReportRef>> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return Err(Error::MissingParameter { name: "keyword" });
    }
    let mut hits: Vec<ReportRef> = view
        .iter()
        .filter(|(_, tokens)| tokens.contains(&keyword))
        .map(|(report, _)| ReportRef::from(report))
        .collect();
    // stable: same-year reports keep corpus order, unknown years sink
    hits.sort_by(|a, b| b.year.cmp(&a.year));
    hits.truncate(limit);
    Ok(hits)
}

/// Headline numbers of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total: usize,
    pub local: usize,
    pub national: usize,
    pub years: Vec<i32>,
    pub institutes: usize,
    pub keywords: usize,
}

pub fn overview(view: &FilteredView<'_>) -> Overview {
    let local = view.iter().filter(|(r, _)| r.scope == Scope::Local).count();
    let mut institutes: Vec<&str> = view.iter().map(|(r, _)| r.institute.as_str()).collect();
    institutes.sort_unstable();
    institutes.dedup();
    Overview {
        total: view.len(),
        local,
        national: view.len() - local,
        years: view.years(),
        institutes: institutes.len(),
        keywords: ranked_keywords(view).len(),
    }
}
