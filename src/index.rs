//! Corpus index: per-report token sets and global keyword statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::RandomState;
use indexmap::IndexMap;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::corpus::Report;
use crate::error::{Error, Result};
use crate::token::{Stopwords, TitleTokens, Tokenizer};

/// Searchable view of the report collection.
///
/// Built in one pass from the reports and the stopword set, never patched.
/// `tokens[i]` always belongs to `reports[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusIndex {
    reports: Arc<Vec<Report>>,
    tokens: Vec<TitleTokens>,
    /// keyword -> number of reports whose title carries it, in discovery order
    kw_count: IndexMap<String, u64, RandomState>,
    /// keyword -> year -> number of reports
    kw_year_count: IndexMap<String, BTreeMap<i32, u64>, RandomState>,
    institute_count: IndexMap<String, u64, RandomState>,
    years: Vec<i32>,
    generation: u64,
}

impl CorpusIndex {
    /// Tokenize every title and derive the keyword tables.
    ///
    /// Keyword counts iterate each report's token *set*, so a word repeated in one
    /// title counts once. Any tokenizer failure aborts the whole build.
    pub fn build<T>(reports: Arc<Vec<Report>>, stopwords: &Stopwords, tokenizer: &T, generation: u64) -> Result<Self>
    where
        T: Tokenizer + ?Sized,
    {
        let tokens = reports
            .par_iter()
            .map(|report| {
                TitleTokens::analyze(tokenizer, &report.title, stopwords).map_err(|e| Error::Tokenize {
                    report_id: report.id.clone(),
                    message: e.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut kw_count: IndexMap<String, u64, RandomState> = IndexMap::default();
        let mut kw_year_count: IndexMap<String, BTreeMap<i32, u64>, RandomState> = IndexMap::default();
        let mut institute_count: IndexMap<String, u64, RandomState> = IndexMap::default();
        let mut years: Vec<i32> = Vec::new();

        for (report, toks) in reports.iter().zip(&tokens) {
            *institute_count.entry(report.institute.clone()).or_insert(0) += 1;
            if let Some(year) = report.year {
                years.push(year);
            }
            for kw in &toks.set {
                *kw_count.entry(kw.clone()).or_insert(0) += 1;
                if let Some(year) = report.year {
                    *kw_year_count.entry(kw.clone()).or_default().entry(year).or_insert(0) += 1;
                }
            }
        }
        years.sort_unstable();
        years.dedup();

        info!(
            "built corpus index generation {generation}: {} reports, {} keywords, {} years",
            reports.len(),
            kw_count.len(),
            years.len()
        );

        Ok(Self {
            reports,
            tokens,
            kw_count,
            kw_year_count,
            institute_count,
            years,
            generation,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Shared handle on the raw reports, reused across rebuilds.
    pub fn reports_arc(&self) -> Arc<Vec<Report>> {
        Arc::clone(&self.reports)
    }

    pub fn report(&self, row: usize) -> Option<&Report> {
        self.reports.get(row)
    }

    pub fn tokens(&self, row: usize) -> Option<&TitleTokens> {
        self.tokens.get(row)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Global keyword counts in discovery order.
    pub fn keyword_counts(&self) -> &IndexMap<String, u64, RandomState> {
        &self.kw_count
    }

    pub fn keyword_count(&self, keyword: &str) -> u64 {
        self.kw_count.get(keyword).copied().unwrap_or(0)
    }

    pub fn keyword_years(&self, keyword: &str) -> Option<&BTreeMap<i32, u64>> {
        self.kw_year_count.get(keyword)
    }

    pub fn institute_counts(&self) -> &IndexMap<String, u64, RandomState> {
        &self.institute_count
    }

    /// Distinct report years, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Encode as CBOR for a warm start.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Ok(serde_cbor::from_slice(bytes)?)
    }
}
