//! Request filters and the filtered report views they select.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::corpus::institute::{council_code, InstituteDirectory};
use crate::corpus::{Report, Scope, ScopeFilter};
use crate::index::CorpusIndex;
use crate::token::TitleTokens;

/// Raw request filter. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub scope: Option<String>,
    pub institute: Option<String>,
    pub year: Option<String>,
    pub q: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn institute(mut self, institute: &str) -> Self {
        self.institute = Some(institute.to_string());
        self
    }

    pub fn year(mut self, year: &str) -> Self {
        self.year = Some(year.to_string());
        self
    }

    pub fn q(mut self, q: &str) -> Self {
        self.q = Some(q.to_string());
        self
    }

    /// Normalize into the canonical form used for selection and cache keys.
    ///
    /// Text fields are trimmed and lowercased, never cut; a year that does not
    /// parse is dropped rather than rejected.
    pub fn resolve(&self) -> ResolvedFilter {
        let text = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        ResolvedFilter {
            scope: self.scope.as_deref().map(ScopeFilter::parse).unwrap_or_default(),
            institute: text(&self.institute),
            year: self.year.as_deref().and_then(|y| y.trim().parse::<i32>().ok()),
            q: text(&self.q),
        }
    }
}

/// Canonical filter. Two requests select the same rows iff their resolved filters are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedFilter {
    pub scope: ScopeFilter,
    pub institute: Option<String>,
    pub year: Option<i32>,
    pub q: Option<String>,
}

impl ResolvedFilter {
    /// Stable text form with text fields cut to `max_len` chars, e.g. `national|nrc|2021|grid`.
    ///
    /// For logs and display only; the resolved filter itself is the cache identity.
    pub fn signature(&self, max_len: usize) -> String {
        let text = |v: &Option<String>| v.as_deref().map(|s| s.chars().take(max_len).collect::<String>()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}",
            self.scope.as_str(),
            text(&self.institute),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            text(&self.q)
        )
    }
}

impl fmt::Display for ResolvedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature(usize::MAX))
    }
}

/// The rows of an index selected by a filter, in corpus order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    index: &'a CorpusIndex,
    rows: Vec<usize>,
    filter: ResolvedFilter,
}

impl<'a> FilteredView<'a> {
    /// Apply scope, year, institute (or council group) and text constraints in that order.
    pub fn select(index: &'a CorpusIndex, directory: &InstituteDirectory, filter: ResolvedFilter) -> Self {
        let council = match (&filter.scope, filter.institute.as_deref()) {
            (ScopeFilter::National, Some(inst)) => council_code(inst),
            _ => None,
        };
        let rows = index
            .reports()
            .iter()
            .enumerate()
            .filter(|(_, report)| filter.scope.contains(report.scope))
            .filter(|(_, report)| filter.year.map_or(true, |y| report.year == Some(y)))
            .filter(|(_, report)| match (council, filter.institute.as_deref()) {
                (Some(code), _) => directory.resolve_group(&report.institute, Scope::National) == Some(code),
                (None, Some(inst)) => report.institute.trim().to_lowercase() == inst,
                (None, None) => true,
            })
            .filter(|(row, report)| match filter.q.as_deref() {
                Some(q) => matches_text(report, index.tokens(*row), q),
                None => true,
            })
            .map(|(row, _)| row)
            .collect();
        Self { index, rows, filter }
    }

    /// Every report of the index.
    pub fn all(index: &'a CorpusIndex) -> Self {
        Self {
            index,
            rows: (0..index.len()).collect(),
            filter: ResolvedFilter::default(),
        }
    }

    pub fn index(&self) -> &'a CorpusIndex {
        self.index
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn filter(&self) -> &ResolvedFilter {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (report, tokens) pairs of the selected rows.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Report, &'a TitleTokens)> + '_ {
        let index = self.index;
        self.rows
            .iter()
            .filter_map(move |&row| Some((index.report(row)?, index.tokens(row)?)))
    }

    /// Distinct years of the selected rows, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.iter().filter_map(|(r, _)| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

fn matches_text(report: &Report, tokens: Option<&TitleTokens>, q: &str) -> bool {
    report.title.to_lowercase().contains(q)
        || tokens.is_some_and(|t| t.set.iter().any(|tok| tok == q || tok.contains(q)))
}
