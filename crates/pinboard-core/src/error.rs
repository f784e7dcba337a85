use std::time::Duration;

use thiserror::Error;

/// Failures of the permission cache backend. Never swallowed by the resolver.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),

    #[error("cache entry '{key}' is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache entry '{key}' could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("User does not have the access")]
    AccessDenied,

    #[error("No such invitation record found")]
    NoInvitation,

    #[error("Please enter the password")]
    PasswordRequired,

    #[error("Invalid password")]
    PasswordInvalid,

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The first failing unit of a fan-out. Every other unit's result is discarded.
    #[error("{unit} unit failed: {cause:#}")]
    Aggregate {
        unit: &'static str,
        cause: anyhow::Error,
    },

    #[error("aggregation did not finish within {0:?}")]
    Deadline(Duration),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
