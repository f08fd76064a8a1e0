//! Normalization of heterogeneous source records.
//!
//! Source collections name their fields inconsistently (`title` vs `name`,
//! `year` vs `date`, bylines as arrays, objects or delimited strings). This is
//! the one place those shapes are resolved; everything downstream sees `Report`.

use log::warn;
use serde_json::{Map, Value};

use crate::corpus::institute::{Institute, InstituteDirectory};
use crate::corpus::{Report, Scope};
use crate::error::{Error, Result};

const ID_KEYS: &[&str] = &["id", "report_id", "reportId", "_id"];
const TITLE_KEYS: &[&str] = &["title", "name", "subject"];
const YEAR_KEYS: &[&str] = &["year", "pub_year", "pubYear", "date", "published"];
const INSTITUTE_KEYS: &[&str] = &["institute", "org", "organization", "agency"];
const URL_KEYS: &[&str] = &["url", "link", "href"];
const AUTHOR_KEYS: &[&str] = &["authors", "author", "researchers", "researcher"];
const SCOPE_KEYS: &[&str] = &["scope", "type"];
const GROUP_KEYS: &[&str] = &["group", "council", "category"];

/// Map raw JSON records onto `Report`s.
///
/// Records without a usable title are skipped with a warning. A record that is
/// not a JSON object is an error, since it means the source itself is malformed.
/// Records lacking an id get their position as id.
pub fn reports_from_json(records: &[Value], default_scope: Scope) -> Result<Vec<Report>> {
    let mut reports = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let obj = record.as_object().ok_or_else(|| Error::Ingest {
            position,
            reason: "record is not an object".to_string(),
        })?;
        let Some(title) = first_string(obj, TITLE_KEYS) else {
            warn!("skipping report record #{position}: no title");
            continue;
        };
        let id = first_string(obj, ID_KEYS).unwrap_or_else(|| position.to_string());
        let scope = first_string(obj, SCOPE_KEYS)
            .and_then(|s| Scope::parse(&s))
            .unwrap_or(default_scope);
        reports.push(Report {
            id,
            year: first_year(obj),
            title,
            institute: first_string(obj, INSTITUTE_KEYS).unwrap_or_default(),
            scope,
            url: first_string(obj, URL_KEYS),
            authors: first_authors(obj),
        });
    }
    Ok(reports)
}

/// Build the institute directory from raw JSON records.
pub fn institutes_from_json(records: &[Value], default_scope: Scope) -> Result<InstituteDirectory> {
    let mut directory = InstituteDirectory::new();
    for (position, record) in records.iter().enumerate() {
        let obj = record.as_object().ok_or_else(|| Error::Ingest {
            position,
            reason: "institute record is not an object".to_string(),
        })?;
        let Some(name) = first_string(obj, TITLE_KEYS).or_else(|| first_string(obj, INSTITUTE_KEYS)) else {
            warn!("skipping institute record #{position}: no name");
            continue;
        };
        let scope = first_string(obj, SCOPE_KEYS)
            .and_then(|s| Scope::parse(&s))
            .unwrap_or(default_scope);
        let group = first_string(obj, GROUP_KEYS).map(|g| g.to_uppercase());
        directory.insert(Institute { name, scope, group });
    }
    Ok(directory)
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

/// First non-blank string (numbers are rendered) under any of `keys`.
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Years come as numbers, numeric strings, or dates such as `2021-05-03`.
fn first_year(obj: &Map<String, Value>) -> Option<i32> {
    match first_value(obj, YEAR_KEYS)? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => parse_year(s),
        _ => None,
    }
}

fn parse_year(text: &str) -> Option<i32> {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

fn first_authors(obj: &Map<String, Value>) -> Vec<String> {
    let Some(value) = first_value(obj, AUTHOR_KEYS) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    collect_authors(value, &mut names);
    names
}

fn collect_authors(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.split([',', ';', '·', '/', '\n'])
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        ),
        Value::Array(items) => items.iter().for_each(|item| collect_authors(item, out)),
        Value::Object(obj) => {
            if let Some(name) = first_string(obj, &["name", "author", "fullname"]) {
                out.push(name);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_aliased_fields() {
        let records = vec![
            json!({"report_id": 7, "name": " Urban heat ", "date": "2021-05-03", "org": "City Institute",
                   "link": "http://x/7", "researcher": "Kim A, Lee B; Park C"}),
            json!({"id": "r2", "title": "Grid storage", "year": 2019, "institute": "Energy Lab",
                   "scope": "national", "authors": [{"name": "Choi D"}, "Han E"]}),
        ];
        let reports = reports_from_json(&records, Scope::Local).unwrap();
        assert_eq!(reports.len(), 2);

        assert_eq!(reports[0].id, "7");
        assert_eq!(reports[0].title, "Urban heat");
        assert_eq!(reports[0].year, Some(2021));
        assert_eq!(reports[0].scope, Scope::Local);
        assert_eq!(reports[0].url.as_deref(), Some("http://x/7"));
        assert_eq!(reports[0].authors, vec!["Kim A", "Lee B", "Park C"]);

        assert_eq!(reports[1].scope, Scope::National);
        assert_eq!(reports[1].authors, vec!["Choi D", "Han E"]);
    }

    #[test]
    fn untitled_records_are_skipped_and_bad_years_dropped() {
        let records = vec![
            json!({"id": "a", "year": "n/a", "title": "Water policy"}),
            json!({"id": "b", "year": 2020}),
        ];
        let reports = reports_from_json(&records, Scope::National).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].year, None);
        assert!(reports[0].authors.is_empty());
    }

    #[test]
    fn non_object_record_is_an_error() {
        let err = reports_from_json(&[json!("oops")], Scope::Local).unwrap_err();
        assert!(matches!(err, Error::Ingest { position: 0, .. }));
    }

    #[test]
    fn institutes_carry_uppercase_groups() {
        let dir = institutes_from_json(
            &[json!({"name": "Energy Lab", "council": "nct", "scope": "national"})],
            Scope::Local,
        )
        .unwrap();
        assert_eq!(dir.resolve_group("energy lab", Scope::National), Some("NCT"));
    }
}
