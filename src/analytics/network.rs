//! Keyword co-occurrence network.

use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analytics::top_keywords;
use crate::filter::FilteredView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub count: u64,
}

/// Undirected edge; `source < target` lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

type PairCounts<'a> = HashMap<(&'a str, &'a str), u64, RandomState>;

/// Co-occurrence of the `top_keywords_n` most frequent keywords within single titles.
///
/// Every unordered pair of restricted keywords sharing a title adds one to
/// that edge. The `edge_top` heaviest edges are returned, heavier first, ties
/// broken by keyword pair.
pub fn network(view: &FilteredView<'_>, top_keywords_n: usize, edge_top: usize) -> Network {
    let top = top_keywords(view, top_keywords_n);
    let allowed: HashSet<&str, RandomState> = top.iter().map(|(k, _)| *k).collect();

    let rows: Vec<_> = view.iter().map(|(_, tokens)| tokens).collect();
    let pairs: PairCounts<'_> = rows
        .par_iter()
        .fold(PairCounts::default, |mut acc, tokens| {
            let kept: Vec<&str> = tokens
                .set
                .iter()
                .map(String::as_str)
                .filter(|k| allowed.contains(k))
                .collect();
            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    let key = if a < b { (*a, *b) } else { (*b, *a) };
                    *acc.entry(key).or_insert(0) += 1;
                }
            }
            acc
        })
        .reduce(PairCounts::default, |mut a, b| {
            for (k, v) in b {
                *a.entry(k).or_insert(0) += v;
            }
            a
        });

    let mut edges: Vec<NetworkEdge> = pairs
        .into_iter()
        .map(|((s, t), w)| NetworkEdge { source: s.to_string(), target: t.to_string(), weight: w })
        .collect();
    edges.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });
    edges.truncate(edge_top);

    Network {
        nodes: top
            .into_iter()
            .map(|(k, c)| NetworkNode { id: k.to_string(), count: c })
            .collect(),
        edges,
    }
}
