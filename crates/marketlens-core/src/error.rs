use thiserror::Error;

/// Validation errors raised before any cache or provider I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("invalid symbol format: '{value}'")]
    InvalidSymbol { value: String },

    #[error("invalid interval '{value}', expected one of 1d, 1wk, 1mo")]
    InvalidInterval { value: String },

    #[error("search query is required")]
    EmptyQuery,
    #[error("search limit must be greater than zero")]
    ZeroLimit,

    #[error("invalid calendar date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },

    #[error("unsupported indicator type: {value}")]
    UnknownIndicator { value: String },
}

/// Configuration errors raised while reading the process environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be an unsigned integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("environment variable {name} must be greater than zero")]
    ZeroValue { name: &'static str },
}
