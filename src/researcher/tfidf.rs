use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::token::TermFrequency;
use crate::utils::sparse::SparseVec;

/// TF and IDF weighting used for profile and query vectors.
///
/// Plug a different implementation into [`IdfTable::build`] and the model
/// builder to change the weighting scheme.
pub trait TfIdfEngine {
    /// Weight of a raw count inside one profile or query.
    fn tf(count: u64) -> f64;
    /// Weight of a term seen in `doc_freq` of `doc_num` profiles.
    fn idf(doc_num: u64, doc_freq: u64) -> f64;
}

/// `tf = 1 + ln(1 + count)`, `idf = ln((N + 1) / (df + 1)) + 1`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTfIdfEngine;

impl TfIdfEngine for DefaultTfIdfEngine {
    #[inline]
    fn tf(count: u64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        1.0 + (1.0 + count as f64).ln()
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        ((doc_num as f64 + 1.0) / (doc_freq as f64 + 1.0)).ln() + 1.0
    }
}

/// Vocabulary dimensions and their IDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdfTable {
    /// keyword dimension, in discovery order
    vocab: IndexSet<Box<str>, RandomState>,
    idf_vec: Vec<f64>,
    doc_num: u64,
}

impl IdfTable {
    /// `doc_freqs` yields (keyword, number of profiles containing it).
    pub fn build<E, I, S>(doc_num: u64, doc_freqs: I) -> Self
    where
        E: TfIdfEngine,
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut vocab: IndexSet<Box<str>, RandomState> = IndexSet::default();
        let mut idf_vec = Vec::new();
        for (term, df) in doc_freqs {
            if vocab.insert(Box::from(term.as_ref())) {
                idf_vec.push(E::idf(doc_num, df));
            }
        }
        Self { vocab, idf_vec, doc_num }
    }

    #[inline]
    pub fn dim(&self, term: &str) -> Option<u32> {
        self.vocab.get_index_of(term).map(|i| i as u32)
    }

    pub fn term(&self, dim: u32) -> Option<&str> {
        self.vocab.get_index(dim as usize).map(|t| t.as_ref())
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocab.get_index_of(term).map(|i| self.idf_vec[i])
    }

    #[inline]
    pub fn idf_at(&self, dim: u32) -> f64 {
        self.idf_vec.get(dim as usize).copied().unwrap_or(0.0)
    }

    pub fn doc_num(&self) -> u64 {
        self.doc_num
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Unit query vector. Terms outside the vocabulary carry no weight.
    pub fn query_vector<E: TfIdfEngine>(&self, freq: &TermFrequency) -> SparseVec<f32> {
        let pairs = freq
            .iter()
            .filter_map(|(term, count)| {
                let dim = self.dim(term)?;
                Some((dim, (E::tf(count) * self.idf_at(dim)) as f32))
            })
            .collect();
        SparseVec::from_pairs(pairs).normalized()
    }
}
