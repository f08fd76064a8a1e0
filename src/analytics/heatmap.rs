use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analytics::top_keywords;
use crate::filter::FilteredView;

/// Institute x keyword share table.
///
/// `values[i][k]` is the fraction of institute `i`'s selected reports whose
/// title carries keyword `k`, so rows compare across institutes of any size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub keywords: Vec<String>,
    pub institutes: Vec<String>,
    /// Selected report count per institute, aligned with `institutes`.
    pub totals: Vec<u64>,
    pub values: Vec<Vec<f64>>,
}

/// Institutes are ordered by report count, then name.
pub fn heatmap(view: &FilteredView<'_>, top_keywords_n: usize) -> Heatmap {
    let keywords: Vec<&str> = top_keywords(view, top_keywords_n).into_iter().map(|(k, _)| k).collect();

    // institute -> (total, hits per keyword)
    let mut rows: IndexMap<&str, (u64, Vec<u64>), RandomState> = IndexMap::default();
    for (report, tokens) in view.iter() {
        let (total, hits) = rows
            .entry(report.institute.as_str())
            .or_insert_with(|| (0, vec![0; keywords.len()]));
        *total += 1;
        for (slot, kw) in hits.iter_mut().zip(&keywords) {
            if tokens.contains(kw) {
                *slot += 1;
            }
        }
    }
    rows.sort_by(|ka, (ta, _), kb, (tb, _)| tb.cmp(ta).then_with(|| ka.cmp(kb)));

    let mut institutes = Vec::with_capacity(rows.len());
    let mut totals = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len());
    for (name, (total, hits)) in rows {
        values.push(hits.iter().map(|&h| h as f64 / total as f64).collect());
        institutes.push(name.to_string());
        totals.push(total);
    }

    Heatmap {
        keywords: keywords.into_iter().map(str::to_string).collect(),
        institutes,
        totals,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::sample_index;

    #[test]
    fn cells_are_per_institute_shares() {
        let index = sample_index();
        let map = heatmap(&FilteredView::all(&index), 3);
        assert_eq!(map.keywords, vec!["urban", "grid", "storage"]);
        assert_eq!(map.institutes, vec!["City Institute", "Energy Lab", "Policy Institute"]);
        assert_eq!(map.totals, vec![2, 2, 1]);
        assert_eq!(map.values[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(map.values[1], vec![0.0, 1.0, 1.0]);
        assert_eq!(map.values[2], vec![1.0, 0.0, 0.0]);
        assert!(map.values.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn empty_view_gives_empty_map() {
        let index = sample_index();
        let view = FilteredView::select(
            &index,
            &Default::default(),
            crate::filter::Filter::new().year("1999").resolve(),
        );
        let map = heatmap(&view, 5);
        assert!(map.keywords.is_empty());
        assert!(map.values.is_empty());
    }
}
