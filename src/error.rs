use std::borrow::Cow;
use std::io;

pub use crate::calendar::CalendarError;

/// Result type used across the conversion engine.
pub type Result<T> = std::result::Result<T, Error>;

/// High-level error type surfaced by the conversion engine.
///
/// Every variant is terminal for the conversion that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad or missing declarations in the sidecar schema document.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Malformed category code/label pairs.
    #[error(transparent)]
    Category(#[from] CategoryError),

    /// Unparseable or unrepresentable calendar text.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// A data row or cell does not match its column schema.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// I/O failure while reading a source or writing a sink.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The sidecar document is not valid JSON or has the wrong shape.
    #[error("schema document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by the delimited-text reader or writer.
    #[error("delimited text error: {0}")]
    Csv(#[from] csv::Error),

    /// A dataset sink rejected an event.
    #[error("dataset sink error: {details}")]
    Sink { details: Cow<'static, str> },
}

impl Error {
    pub(crate) fn sink(details: impl Into<Cow<'static, str>>) -> Self {
        Self::Sink {
            details: details.into(),
        }
    }
}

/// Problems with the declarations in the schema document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("variable entry {index} has no name")]
    MissingName { index: usize },

    #[error("column {column} is declared more than once")]
    DuplicateColumn { column: String },

    #[error("column {0} has no entry in the schema document")]
    ColumnNotFound(String),

    #[error("column {column} has unknown type {found:?}")]
    UnknownType {
        column: String,
        found: Option<String>,
    },

    #[error("invalid missing-value declaration for column {column}: {details}")]
    InvalidMissing {
        column: String,
        details: Cow<'static, str>,
    },

    #[error("missing value {value} is not valid for column {column}")]
    BadMissingValue { column: String, value: String },

    #[error("column {column} declares {count} missing values, {target} allows {limit}")]
    TooManyMissing {
        column: String,
        count: usize,
        limit: Cow<'static, str>,
        target: &'static str,
    },

    #[error("{target} does not support {what} missing values on column {column}")]
    UnsupportedMissing {
        column: String,
        what: &'static str,
        target: &'static str,
    },
}

/// Problems with category (value label) declarations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("category {index} of column {column} has no {field}")]
    MissingField {
        column: String,
        index: usize,
        field: &'static str,
    },

    #[error("category code {code} is not valid for column {column}")]
    BadCode { column: String, code: String },
}

/// Problems found while streaming data rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("source has no header row")]
    EmptySource,

    #[error("row {row} has {found} cells, header declares {expected}")]
    RaggedRow {
        row: u64,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: {details}")]
    MalformedCell {
        row: u64,
        column: String,
        details: Cow<'static, str>,
    },

    #[error("header cell {index} is not valid text in the source encoding")]
    MalformedHeader { index: usize },
}

/// A single cell that does not decode for its column; positioned by the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{details}")]
pub struct CellError {
    pub details: Cow<'static, str>,
}

impl CellError {
    pub(crate) fn new(details: impl Into<Cow<'static, str>>) -> Self {
        Self {
            details: details.into(),
        }
    }

    #[must_use]
    pub fn at(self, row: u64, column: &str) -> ConversionError {
        ConversionError::MalformedCell {
            row,
            column: column.to_owned(),
            details: self.details,
        }
    }
}
