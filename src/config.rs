//! Engine configuration.
//!
//! Every section falls back to its defaults, so a config file only needs to
//! name the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tokenizer: TokenizerConfig,
    pub filter: FilterConfig,
    pub analytics: AnalyticsConfig,
    pub researcher: ResearcherConfig,
}

impl EngineConfig {
    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Settings of the built-in tokenizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Tokens shorter than this (in chars) are dropped.
    pub min_token_chars: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { min_token_chars: 2 }
    }
}

/// Request filter normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter text fields are cut to this many chars in signatures; matching uses the full text.
    pub max_field_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { max_field_len: 128 }
    }
}

/// Thresholds of the trend aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Noise floor on the compare-year count of a rising keyword.
    pub rising_min_count: u64,
    /// How many of the most frequent keywords are checked for bursts.
    pub burst_vocab: usize,
    /// Minimum last-year count of a burst keyword.
    pub burst_min_count: u64,
    /// A keyword bursts when its z-score is strictly above this.
    pub burst_z_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            rising_min_count: 3,
            burst_vocab: 200,
            burst_min_count: 3,
            burst_z_threshold: 2.0,
        }
    }
}

/// Researcher model and query expansion bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearcherConfig {
    /// Non-zero dimensions kept per profile vector.
    pub vector_top_k: usize,
    /// Expertise tags shown per profile.
    pub tag_top_k: usize,
    /// Recent reports kept per profile.
    pub recent_reports: usize,
    /// Vocabulary size of the expansion co-occurrence map.
    pub expansion_vocab: usize,
    /// Neighbours considered per query token.
    pub expansion_per_token: usize,
    /// Cap on the number of terms expansion may add.
    pub expansion_max_terms: usize,
}

impl Default for ResearcherConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 240,
            tag_top_k: 16,
            recent_reports: 5,
            expansion_vocab: 2000,
            expansion_per_token: 5,
            expansion_max_terms: 6,
        }
    }
}
