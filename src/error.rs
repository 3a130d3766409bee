//! All error types for the satloc crate.
//!
//! These are returned from every fallible operation (table parsing, key decoding,
//! container walking, output naming). Row and stream context travels with the
//! error so a message is actionable without a debugger.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("malformed resource key `{key}`{}", row_suffix(.row))]
    MalformedKey { key: String, row: Option<usize> },

    #[error("ambiguous name: {0}")]
    AmbiguousName(String),

    #[error("unsupported container shape: {0}")]
    UnsupportedContainerShape(String),

    #[error("I/O error on {context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid container `{name}`: {message}")]
    InvalidContainer { name: String, message: String },

    #[error("localizer failed on `{stream}`: {message}")]
    Localizer { stream: String, message: String },

    #[error("invalid culture name `{0}`")]
    InvalidCulture(String),

    #[error("unknown localization category `{0}`")]
    UnknownCategory(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" in row {}", r)).unwrap_or_default()
}

impl Error {
    /// Wraps an I/O error with the name of the file, stream, or entry it happened on.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoFailure {
            context: context.into(),
            source,
        }
    }

    /// Creates a new malformed-row error for a 1-based row number.
    pub fn malformed_row(row: usize, message: impl Into<String>) -> Self {
        Error::MalformedRow {
            row,
            message: message.into(),
        }
    }

    /// Creates a new error reported by an external localizer.
    pub fn localizer(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Localizer {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid-container error.
    pub fn invalid_container(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidContainer {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Attaches a row number to a key error raised outside of table parsing.
    pub fn at_row(self, row: usize) -> Self {
        match self {
            Error::MalformedKey { key, row: None } => Error::MalformedKey {
                key,
                row: Some(row),
            },
            other => other,
        }
    }

    /// Whether this failure is confined to a single leaf record and may be
    /// tolerated when the run uses [`crate::options::FailurePolicy::SkipLeaf`].
    pub fn is_leaf_local(&self) -> bool {
        matches!(
            self,
            Error::IoFailure { .. } | Error::Io(_) | Error::Localizer { .. }
        )
    }
}
