//! Rising and bursting keywords.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::{dense_series, ranked_keywords, top_keywords, yearly_counts};
use crate::config::AnalyticsConfig;
use crate::filter::FilteredView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RisingKeyword {
    pub keyword: String,
    pub base_count: u64,
    pub compare_count: u64,
    /// `(compare + 1) / (base + 1)`
    pub growth: f64,
}

/// Growth between the two most recent years of the view.
/// Both years are `None` when the view spans fewer than two years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RisingKeywords {
    pub base_year: Option<i32>,
    pub compare_year: Option<i32>,
    pub items: Vec<RisingKeyword>,
}

pub fn rising_keywords(view: &FilteredView<'_>, top: usize, cfg: &AnalyticsConfig) -> RisingKeywords {
    let years = view.years();
    let &[.., base_year, compare_year] = years.as_slice() else {
        return RisingKeywords { base_year: None, compare_year: None, items: Vec::new() };
    };

    let mut base: BTreeMap<&str, u64> = BTreeMap::new();
    let mut compare: BTreeMap<&str, u64> = BTreeMap::new();
    for (report, tokens) in view.iter() {
        let bucket = match report.year {
            Some(y) if y == base_year => &mut base,
            Some(y) if y == compare_year => &mut compare,
            _ => continue,
        };
        for kw in &tokens.set {
            *bucket.entry(kw.as_str()).or_insert(0) += 1;
        }
    }

    // walk in frequency order so equal growth keeps the usual keyword ranking
    let mut items: Vec<RisingKeyword> = ranked_keywords(view)
        .keys()
        .filter_map(|kw| {
            let compare_count = compare.get(kw).copied().unwrap_or(0);
            if compare_count < cfg.rising_min_count {
                return None;
            }
            let base_count = base.get(kw).copied().unwrap_or(0);
            Some(RisingKeyword {
                keyword: kw.to_string(),
                base_count,
                compare_count,
                growth: (compare_count as f64 + 1.0) / (base_count as f64 + 1.0),
            })
        })
        .collect();
    items.sort_by(|a, b| b.growth.total_cmp(&a.growth));
    items.truncate(top);

    RisingKeywords {
        base_year: Some(base_year),
        compare_year: Some(compare_year),
        items,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstKeyword {
    pub keyword: String,
    pub last_val: u64,
    pub mean: f64,
    pub std: f64,
    pub z: f64,
}

/// Keywords whose last-year count is anomalous against their own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstKeywords {
    pub last_year: Option<i32>,
    pub items: Vec<BurstKeyword>,
}

/// z-score of the last year against the mean and deviation of all earlier years.
///
/// Only the `burst_vocab` most frequent keywords are examined. The deviation is
/// floored at 1 so flat histories do not explode.
pub fn burst_keywords(view: &FilteredView<'_>, top: usize, cfg: &AnalyticsConfig) -> BurstKeywords {
    let years = view.years();
    let Some((&last_year, history)) = years.split_last() else {
        return BurstKeywords { last_year: None, items: Vec::new() };
    };
    if history.is_empty() {
        return BurstKeywords { last_year: Some(last_year), items: Vec::new() };
    }

    let keywords: Vec<&str> = top_keywords(view, cfg.burst_vocab).into_iter().map(|(k, _)| k).collect();
    let table = yearly_counts(view, &keywords);

    let mut items: Vec<BurstKeyword> = keywords
        .iter()
        .filter_map(|kw| {
            let series = dense_series(table.get(*kw), &years);
            let (&last_val, past) = series.split_last()?;
            let (mean, std) = mean_std(past);
            let std = std.max(1.0);
            let z = (last_val as f64 - mean) / std;
            (z > cfg.burst_z_threshold && last_val >= cfg.burst_min_count).then(|| BurstKeyword {
                keyword: kw.to_string(),
                last_val,
                mean,
                std,
                z,
            })
        })
        .collect();
    items.sort_by(|a, b| b.z.total_cmp(&a.z));
    items.truncate(top);

    BurstKeywords { last_year: Some(last_year), items }
}

/// Population mean and standard deviation.
fn mean_std(values: &[u64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
