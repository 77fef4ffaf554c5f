//! Error types for docbind.
//!
//! One [`BindError`] enum covers the whole engine via `thiserror`. Errors keep
//! their kind from the field pipeline all the way to the task boundary — the
//! execution engine neither downgrades nor retries them.

/// Top-level error type for all binding and scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// Malformed binding metadata (bad CSS query, bad regex, unsupported
    /// conversion, missing factory). Signals a programming error in the
    /// caller's declarations; detected lazily at first use.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A query matched no element at the required index. Suppressible per
    /// field with `lenient`.
    #[error("query '{query}' matched no element at index {index} on document {origin}")]
    NotFound {
        query: String,
        index: usize,
        origin: String,
    },

    /// A query matched more than one element where a single result was
    /// required and no `result_index` was given.
    #[error("query '{query}' matched {count} elements where one was expected")]
    Ambiguous { query: String, count: usize },

    /// A validator rejected the normalized text.
    #[error("validation failed for field '{field}': {message} (value: {value:?})")]
    Validation {
        field: String,
        value: String,
        message: String,
    },

    /// Conversion from normalized text to the target value type failed.
    #[error("cannot convert {value:?} to {target}: {message}")]
    Conversion {
        target: &'static str,
        value: String,
        message: String,
    },

    /// Source resolution failed after exhausting retries.
    #[error("fetch failed for {url} after {attempts} attempts: {message}")]
    Fetch {
        url: String,
        attempts: u32,
        message: String,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BindError>;

impl BindError {
    /// Create a configuration error from any displayable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a conversion error for the given target type.
    pub fn conversion<T>(value: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conversion {
            target: std::any::type_name::<T>(),
            value: value.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error naming the offending field.
    pub fn validation(
        field: impl Into<String>,
        value: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.into(),
            message: msg.into(),
        }
    }
}
