//! Error types for the sacrament importer

use thiserror::Error;

/// Result type for a single import operation
pub type Result<T> = std::result::Result<T, ImportError>;

/// Everything that can make one row (or one file) fail to import
#[derive(Error, Debug)]
pub enum ImportError {
    /// Row or header does not carry the columns the schema expects
    #[error("column count mismatch: expected at least {expected} columns, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    /// A date column holds something other than DD/MM/YYYY or YYYY-MM-DD
    #[error("cannot parse {column} {value:?} as a date")]
    InvalidDate { column: &'static str, value: String },

    /// Both name columns of the principal person are empty
    #[error("row has no first or last name for the principal person")]
    MissingPrincipal,

    /// A fact depends on an event that this row does not create
    #[error("{what} requires a {event} in the same row")]
    MissingEvent {
        what: &'static str,
        event: &'static str,
    },

    /// A column is required because a related column is filled in
    #[error("{column} is required when {because} is present")]
    MissingValue {
        column: &'static str,
        because: &'static str,
    },

    /// Storage rejected the row (constraint, I/O, locking)
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure tagged with the file and row it came from.
///
/// Row 0 means the file itself could not be read or was rejected.
#[derive(Error, Debug)]
#[error("{file}:{row} - {source}")]
pub struct RowImportError {
    pub file: String,
    pub row: usize,
    #[source]
    pub source: ImportError,
}

impl RowImportError {
    pub fn new(file: impl Into<String>, row: usize, source: ImportError) -> Self {
        Self {
            file: file.into(),
            row,
            source,
        }
    }

    /// True when the database rejected the row rather than its data
    pub fn is_storage(&self) -> bool {
        matches!(self.source, ImportError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_display_format() {
        let err = RowImportError::new(
            "baptisms.csv",
            7,
            ImportError::InvalidDate {
                column: "birth_date",
                value: "31/31/1800".to_string(),
            },
        );

        assert_eq!(
            err.to_string(),
            "baptisms.csv:7 - cannot parse birth_date \"31/31/1800\" as a date"
        );
        assert!(!err.is_storage());
    }

    #[test]
    fn test_storage_errors_are_tagged() {
        let err = RowImportError::new(
            "a.csv",
            2,
            ImportError::Storage(rusqlite::Error::QueryReturnedNoRows),
        );

        assert!(err.is_storage());
        assert!(err.to_string().starts_with("a.csv:2 - storage error"));
    }
}
