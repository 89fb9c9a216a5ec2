//! Errors raised by the normalization and aggregation core.

use thiserror::Error;

/// Errors that can occur while normalizing or aggregating match history.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required field is missing or has the wrong shape.
    #[error("Schema error in record {record}: field `{field}` {issue}")]
    Schema {
        record: usize,
        field: String,
        issue: SchemaIssue,
    },

    /// The `added` timestamp could not be parsed.
    #[error("Parse error in record {record}: invalid timestamp {value:?}: {source}")]
    Parse {
        record: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// No rows qualified for aggregation after mode filtering.
    #[error("No qualifying games for {stage} (mode: {mode})")]
    EmptyResult { stage: &'static str, mode: String },

    /// A column selector that the grouped table does not carry.
    #[error("Unknown field `{0}`")]
    UnknownField(String),

    /// Two rows map to the same pivot cell.
    #[error("Duplicate cell at x={x:?}, y={y:?}")]
    DuplicateCell { x: String, y: String },
}

/// What was wrong with a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    Missing,
    Malformed(String),
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaIssue::Missing => write!(f, "is missing"),
            SchemaIssue::Malformed(reason) => write!(f, "is malformed: {}", reason),
        }
    }
}

impl AnalysisError {
    pub(crate) fn missing(record: usize, field: impl Into<String>) -> Self {
        AnalysisError::Schema {
            record,
            field: field.into(),
            issue: SchemaIssue::Missing,
        }
    }

    pub(crate) fn malformed(
        record: usize,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AnalysisError::Schema {
            record,
            field: field.into(),
            issue: SchemaIssue::Malformed(reason.into()),
        }
    }

    /// True for the schema variant, which a skip policy may tolerate.
    pub fn is_schema(&self) -> bool {
        matches!(self, AnalysisError::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
