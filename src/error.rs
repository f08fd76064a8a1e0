//! Error types for the analytics engine.

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Data-insufficiency (too few years, empty scope, no co-occurrence data) and
/// permissive-parse conditions (malformed year, unknown institute) are not errors;
/// they produce empty results instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory request parameter was missing or blank.
    #[error("missing required parameter: {name}")]
    MissingParameter {
        /// Name of the parameter.
        name: &'static str,
    },

    /// The tokenizer rejected a report title during an index build.
    #[error("failed to tokenize report {report_id}: {message}")]
    Tokenize {
        /// Id of the report whose title failed.
        report_id: String,
        /// Tokenizer supplied reason.
        message: String,
    },

    /// The tokenizer rejected a search query.
    #[error("failed to tokenize query: {message}")]
    Query {
        /// Tokenizer supplied reason.
        message: String,
    },

    /// A source record could not be mapped onto a `Report` or institute entry.
    #[error("cannot ingest record #{position}: {reason}")]
    Ingest {
        /// Position of the record in the source collection.
        position: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Configuration text was not valid.
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),

    /// An index snapshot could not be encoded or decoded.
    #[error("index snapshot codec error: {0}")]
    Snapshot(#[from] serde_cbor::Error),
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;
