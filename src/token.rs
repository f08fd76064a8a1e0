//! Tokenization adapter.
//!
//! Language-specific segmentation lives behind the [`Tokenizer`] trait; this
//! module turns a title into the ordered token sequence and the deduplicated
//! token set the index works with.

use std::collections::HashSet;

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Set of excluded tokens. Stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwords {
    words: HashSet<String, RandomState>,
}

impl Stopwords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        !word.is_empty() && self.words.insert(word)
    }

    pub fn remove(&mut self, word: &str) -> bool {
        self.words.remove(&word.trim().to_lowercase())
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        if self.words.contains(token) {
            return true;
        }
        // fast path above covers tokens that are already normalized
        token.chars().any(char::is_uppercase) && self.words.contains(&token.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words in sorted order.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut words: Vec<String> = self.words.iter().cloned().collect();
        words.sort_unstable();
        words
    }
}

impl<S: AsRef<str>> FromIterator<S> for Stopwords {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Stopwords::new();
        for word in iter {
            set.insert(word.as_ref());
        }
        set
    }
}

/// Failure reported by a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError(pub String);

/// Splits free text into normalized word tokens, dropping stopwords.
///
/// Implementations must be deterministic: the index relies on rebuilding to
/// the same token sets from the same inputs.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str, stopwords: &Stopwords) -> Result<Vec<String>, TokenizeError>;
}

/// Lowercasing tokenizer that splits on anything that is not alphanumeric.
/// Purely numeric tokens are dropped.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    min_chars: usize,
}

impl SimpleTokenizer {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars: min_chars.max(1) }
    }
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str, stopwords: &Stopwords) -> Result<Vec<String>, TokenizeError> {
        Ok(text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|raw| raw.chars().count() >= self.min_chars)
            .filter(|raw| !raw.chars().all(|c| c.is_numeric()))
            .map(str::to_lowercase)
            .filter(|tok| !stopwords.contains(tok))
            .collect())
    }
}

/// Tokens of one title: the ordered sequence and its first-seen-ordered set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleTokens {
    pub sequence: Vec<String>,
    pub set: IndexSet<String, RandomState>,
}

impl TitleTokens {
    pub fn analyze<T>(tokenizer: &T, text: &str, stopwords: &Stopwords) -> Result<Self, TokenizeError>
    where
        T: Tokenizer + ?Sized,
    {
        let sequence = tokenizer.tokenize(text, stopwords)?;
        let set = sequence.iter().cloned().collect();
        Ok(Self { sequence, set })
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.set.contains(token)
    }
}

/// Occurrence counts of terms, in first-seen order.
///
/// # Examples
/// ```
/// use research_trends::token::TermFrequency;
/// let mut freq = TermFrequency::new();
/// freq.add_terms(&["grid", "storage", "grid"]);
/// assert_eq!(freq.term_count("grid"), 2);
/// assert_eq!(freq.term_sum(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermFrequency {
    term_count: IndexMap<String, u64, RandomState>,
    total_term_count: u64,
}

impl TermFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        *self.term_count.entry(term.to_string()).or_insert(0) += 1;
        self.total_term_count += 1;
        self
    }

    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for term in terms {
            self.add_term(term.as_ref());
        }
        self
    }

    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }

    /// (term, count) in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_count.iter().map(|(t, &c)| (t.as_str(), c))
    }

    pub fn term_num(&self) -> usize {
        self.term_count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }
}
