//! Errors raised synchronously by data sources.
//!
//! Transport failures are deliberately absent: a failed fetch never returns
//! `Err`, it drives the source into [`State::Error`](crate::State::Error) and
//! emits [`Event::XhrError`](crate::Event::XhrError).

use crate::record::RowId;

/// Configuration and binding errors for the data layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// A source with the same id is already registered.
    #[error("a data source with id '{0}' is already registered")]
    DuplicateId(String),
    /// No source is registered under the id.
    #[error("no data source registered with id '{0}'")]
    UnknownSource(String),
    /// The row id is not present in the data set.
    #[error("row id '{row_id}' does not exist in data set '{source_id}'")]
    UnknownRowId { source_id: String, row_id: RowId },
    /// The row index is outside the effective view.
    #[error("row index {index} is out of range for data set '{source_id}' ({len} rows)")]
    RowIndexOutOfRange {
        source_id: String,
        index: usize,
        len: usize,
    },
    /// A value that should be a record (JSON object) was something else.
    #[error("expected a record (JSON object), found {0}")]
    NotARecord(String),
    /// `load_data` was called on a source without a URL.
    #[error("data set '{0}' has no url configured")]
    MissingUrl(String),
    /// `sort` was called with no columns.
    #[error("sort requires at least one column")]
    EmptySort,
    /// A `{placeholder}` in a URL template had no value in the bound row.
    #[error("placeholder '{placeholder}' in '{template}' cannot be resolved")]
    UnresolvedPlaceholder {
        template: String,
        placeholder: String,
    },
    /// A page number outside `1..=pages`.
    #[error("page {page} is out of range (1..={pages})")]
    PageOutOfRange { page: usize, pages: usize },
    /// Page sizes must be positive.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    /// A response body could not be parsed by its format handler.
    #[error("failed to parse {format} response: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },
    /// Declarative configuration was invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = DataError> = std::result::Result<T, E>;
