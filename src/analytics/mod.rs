//! Aggregations over a filtered view.
//!
//! Every function here is pure given the view. Keyword rankings break count
//! ties by discovery order (first appearance in corpus order), which is what a
//! stable sort over an insertion-ordered map yields.

pub mod heatmap;
pub mod keyword;
pub mod network;
pub mod trend;

use std::collections::BTreeMap;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::filter::FilteredView;

pub use heatmap::{heatmap, Heatmap};
pub use keyword::{
    keyword_series, keyword_stats, overview, related_reports, top5_trends, word_cloud, KeywordSeries,
    KeywordStats, Overview, TrendSeries,
};
pub use network::{network, Network};
pub use trend::{burst_keywords, rising_keywords, BurstKeywords, RisingKeywords};

/// A keyword and the number of selected reports carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// A per-year count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

/// Keyword counts of the view, most frequent first.
pub(crate) fn ranked_keywords<'a>(view: &FilteredView<'a>) -> IndexMap<&'a str, u64, RandomState> {
    let mut counts: IndexMap<&'a str, u64, RandomState> = IndexMap::default();
    for (_, tokens) in view.iter() {
        for kw in &tokens.set {
            *counts.entry(kw.as_str()).or_insert(0) += 1;
        }
    }
    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts
}

/// The `top` most frequent keywords of the view.
pub(crate) fn top_keywords<'a>(view: &FilteredView<'a>, top: usize) -> Vec<(&'a str, u64)> {
    ranked_keywords(view).into_iter().take(top).collect()
}

/// keyword -> year -> count for the selected rows, restricted to `keywords`.
pub(crate) fn yearly_counts<'a>(view: &FilteredView<'a>, keywords: &[&str]) -> IndexMap<String, BTreeMap<i32, u64>, RandomState> {
    let mut table: IndexMap<String, BTreeMap<i32, u64>, RandomState> =
        keywords.iter().map(|k| (k.to_string(), BTreeMap::new())).collect();
    for (report, tokens) in view.iter() {
        let Some(year) = report.year else { continue };
        for kw in &tokens.set {
            if let Some(series) = table.get_mut(kw.as_str()) {
                *series.entry(year).or_insert(0) += 1;
            }
        }
    }
    table
}

/// Dense per-year series over `years`, zero-filled.
pub(crate) fn dense_series(counts: Option<&BTreeMap<i32, u64>>, years: &[i32]) -> Vec<u64> {
    years
        .iter()
        .map(|y| counts.and_then(|c| c.get(y)).copied().unwrap_or(0))
        .collect()
}
