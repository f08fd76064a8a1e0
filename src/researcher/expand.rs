//! Co-occurrence based query expansion.

use std::collections::HashMap;

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::token::TitleTokens;

/// For each frequent keyword, the keywords sharing titles with it, most shared first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooccurrenceMap {
    neighbours: IndexMap<String, Vec<(String, u64)>, RandomState>,
}

impl CooccurrenceMap {
    /// Count title-level co-occurrence among the `vocab_limit` most frequent keywords.
    pub fn build<'a, I>(titles: I, vocab_limit: usize) -> Self
    where
        I: IntoIterator<Item = &'a TitleTokens> + Clone,
    {
        let mut freq: IndexMap<&str, u64, RandomState> = IndexMap::default();
        for tokens in titles.clone() {
            for kw in &tokens.set {
                *freq.entry(kw.as_str()).or_insert(0) += 1;
            }
        }
        freq.sort_by(|_, a, _, b| b.cmp(a));
        freq.truncate(vocab_limit);

        let mut pairs: HashMap<(usize, usize), u64, RandomState> = HashMap::default();
        for tokens in titles {
            let dims: Vec<usize> = tokens.set.iter().filter_map(|kw| freq.get_index_of(kw.as_str())).collect();
            for (i, &a) in dims.iter().enumerate() {
                for &b in &dims[i + 1..] {
                    *pairs.entry((a, b)).or_insert(0) += 1;
                    *pairs.entry((b, a)).or_insert(0) += 1;
                }
            }
        }

        let mut lists: Vec<Vec<(usize, u64)>> = vec![Vec::new(); freq.len()];
        for ((a, b), count) in pairs {
            lists[a].push((b, count));
        }
        let neighbours = lists
            .into_iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .filter_map(|(dim, mut list)| {
                // more shared titles first, then the globally more frequent neighbour
                list.sort_by(|x, y| y.1.cmp(&x.1).then_with(|| x.0.cmp(&y.0)));
                let (kw, _) = freq.get_index(dim)?;
                let list = list
                    .into_iter()
                    .filter_map(|(n, c)| freq.get_index(n).map(|(k, _)| (k.to_string(), c)))
                    .collect();
                Some((kw.to_string(), list))
            })
            .collect();
        Self { neighbours }
    }

    pub fn neighbours(&self, keyword: &str) -> &[(String, u64)] {
        self.neighbours.get(keyword).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Add up to `per_token` unseen neighbours of each base token, `max_terms` in total.
    pub fn expand(&self, base_tokens: &[String], per_token: usize, max_terms: usize) -> QueryExpansion {
        let mut present: IndexSet<&str, RandomState> = base_tokens.iter().map(String::as_str).collect();
        let distinct: Vec<&str> = present.iter().copied().collect();
        let mut pairs = Vec::new();
        for from in distinct {
            if pairs.len() >= max_terms {
                break;
            }
            let fresh: Vec<&str> = self
                .neighbours(from)
                .iter()
                .map(|(n, _)| n.as_str())
                .filter(|n| !present.contains(n))
                .take(per_token.min(max_terms - pairs.len()))
                .collect();
            for to in fresh {
                present.insert(to);
                pairs.push(Expansion { from: from.to_string(), to: to.to_string() });
            }
        }
        let mut expanded = base_tokens.to_vec();
        expanded.extend(pairs.iter().map(|e| e.to.clone()));
        QueryExpansion {
            base: base_tokens.to_vec(),
            expanded,
            pairs,
        }
    }
}

/// One added term and the query token that pulled it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExpansion {
    /// Query tokens as tokenized, repeats kept.
    pub base: Vec<String>,
    /// `base` followed by the added terms.
    pub expanded: Vec<String>,
    pub pairs: Vec<Expansion>,
}

impl QueryExpansion {
    /// Added terms, each once, in the order they were added.
    pub fn suggestions(&self) -> Vec<String> {
        let mut seen: IndexSet<&str, RandomState> = IndexSet::default();
        for e in &self.pairs {
            seen.insert(e.to.as_str());
        }
        seen.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{SimpleTokenizer, Stopwords};

    fn titles(texts: &[&str]) -> Vec<TitleTokens> {
        texts
            .iter()
            .map(|t| TitleTokens::analyze(&SimpleTokenizer::default(), t, &Stopwords::new()).unwrap())
            .collect()
    }

    #[test]
    fn neighbours_are_ordered_by_shared_titles() {
        let t = titles(&["grid storage policy", "grid storage", "grid battery", "urban policy"]);
        let map = CooccurrenceMap::build(&t, 100);
        let grid: Vec<&str> = map.neighbours("grid").iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(grid, vec!["storage", "policy", "battery"]);
        assert_eq!(map.neighbours("grid")[0].1, 2);
        assert!(map.neighbours("unknown").is_empty());
    }

    #[test]
    fn vocab_limit_restricts_keywords() {
        let t = titles(&["grid storage", "grid storage", "grid battery"]);
        let map = CooccurrenceMap::build(&t, 2);
        assert_eq!(map.neighbours("grid").len(), 1);
        assert!(map.neighbours("battery").is_empty());
    }

    #[test]
    fn expansion_respects_caps_and_skips_present_terms() {
        let t = titles(&[
            "grid storage policy battery market tariff",
            "grid storage",
            "urban policy heat",
        ]);
        let map = CooccurrenceMap::build(&t, 100);
        let base = vec!["grid".to_string(), "policy".to_string()];
        let exp = map.expand(&base, 2, 3);
        assert_eq!(exp.pairs.len(), 3);
        assert_eq!(exp.pairs[0], Expansion { from: "grid".into(), to: "storage".into() });
        assert!(exp.pairs.iter().all(|p| !base.contains(&p.to)));
        assert_eq!(exp.expanded.len(), 5);
        assert_eq!(exp.suggestions().len(), 3);
    }

    #[test]
    fn empty_map_adds_nothing() {
        let exp = CooccurrenceMap::default().expand(&["grid".to_string()], 5, 6);
        assert!(exp.pairs.is_empty());
        assert_eq!(exp.expanded, vec!["grid"]);
    }
}
