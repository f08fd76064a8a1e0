use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::corpus::Scope;

/// Council short codes that group national institutes.
pub const COUNCIL_CODES: [&str; 2] = ["NRC", "NCT"];

/// Returns the canonical council code when `value` names one (case-insensitive).
pub fn council_code(value: &str) -> Option<&'static str> {
    let value = value.trim();
    COUNCIL_CODES.iter().copied().find(|code| code.eq_ignore_ascii_case(value))
}

/// Metadata of one institute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institute {
    pub name: String,
    pub scope: Scope,
    /// Council group tag, e.g. `NRC`.
    pub group: Option<String>,
}

/// Lookup table of institute metadata, keyed by trimmed lowercase name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstituteDirectory {
    entries: IndexMap<String, Institute, RandomState>,
}

impl InstituteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries with the same name replace earlier ones.
    pub fn insert(&mut self, institute: Institute) {
        self.entries.insert(directory_key(&institute.name), institute);
    }

    pub fn get(&self, name: &str) -> Option<&Institute> {
        self.entries.get(&directory_key(name))
    }

    /// Group tag of `name`, only when the institute is registered under `scope`.
    pub fn resolve_group(&self, name: &str, scope: Scope) -> Option<&str> {
        self.get(name)
            .filter(|inst| inst.scope == scope)
            .and_then(|inst| inst.group.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Institute> {
        self.entries.values()
    }
}

impl FromIterator<Institute> for InstituteDirectory {
    fn from_iter<T: IntoIterator<Item = Institute>>(iter: T) -> Self {
        let mut dir = Self::new();
        for inst in iter {
            dir.insert(inst);
        }
        dir
    }
}

fn directory_key(name: &str) -> String {
    name.trim().to_lowercase()
}
