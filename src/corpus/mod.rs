pub mod ingest;
pub mod institute;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which research system published a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    National,
}

impl Scope {
    /// Parse `local` / `national`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Scope::Local),
            "national" => Some(Scope::National),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::National => "national",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope selection of a request. `All` is local and national together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeFilter {
    #[default]
    All,
    Local,
    National,
}

impl ScopeFilter {
    /// Unknown or empty values select everything.
    pub fn parse(value: &str) -> Self {
        match Scope::parse(value) {
            Some(Scope::Local) => ScopeFilter::Local,
            Some(Scope::National) => ScopeFilter::National,
            None => ScopeFilter::All,
        }
    }

    #[inline]
    pub fn contains(&self, scope: Scope) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Local => scope == Scope::Local,
            ScopeFilter::National => scope == Scope::National,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeFilter::All => "all",
            ScopeFilter::Local => "local",
            ScopeFilter::National => "national",
        }
    }

    /// Slot of this selector in per-scope tables.
    pub(crate) fn slot(&self) -> usize {
        match self {
            ScopeFilter::All => 0,
            ScopeFilter::Local => 1,
            ScopeFilter::National => 2,
        }
    }
}

/// A research report record.
/// Immutable once loaded; every derived structure points back at it by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub year: Option<i32>,
    pub title: String,
    pub institute: String,
    pub scope: Scope,
    pub url: Option<String>,
    /// Byline in source order, may be empty.
    pub authors: Vec<String>,
}

/// Compact report reference returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRef {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub institute: String,
    pub url: Option<String>,
}

impl From<&Report> for ReportRef {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            year: report.year,
            institute: report.institute.clone(),
            url: report.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filter_parsing_is_permissive() {
        assert_eq!(ScopeFilter::parse(" National "), ScopeFilter::National);
        assert_eq!(ScopeFilter::parse("LOCAL"), ScopeFilter::Local);
        assert_eq!(ScopeFilter::parse("everything"), ScopeFilter::All);
        assert_eq!(ScopeFilter::parse(""), ScopeFilter::All);
    }

    #[test]
    fn all_contains_both_scopes() {
        assert!(ScopeFilter::All.contains(Scope::Local));
        assert!(ScopeFilter::All.contains(Scope::National));
        assert!(!ScopeFilter::Local.contains(Scope::National));
    }
}
