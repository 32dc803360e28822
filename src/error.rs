use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("invalid record `{line}`: missing `;` delimiter")]
    MissingDelimiter { line: String },

    #[error("invalid record `{line}`: {source}")]
    InvalidUsage {
        line: String,
        source: ParseIntError,
    },

    #[error("total usage for customer `{customer}` overflows u64")]
    UsageOverflow { customer: String },

    #[error("no usage records in input")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, UsageError>;
