// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Rejections raised while sanitizing the inbound query, before any
/// outbound call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing subreddit parameter")]
    MissingSubreddit,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Outcome classification for a single fetch strategy. Every variant
/// except `NotFound` is a continuation signal: the chain records it and
/// moves on to the next strategy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("subreddit does not exist upstream")]
    NotFound,
    #[error("upstream blocked the request: {0}")]
    Blocked(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed body: {0}")]
    Parse(String),
}

impl FetchError {
    /// A terminal error stops the chain: the upstream gave a definitive
    /// answer, so trying further strategies would only mask it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Aggregate result of running the whole attempt chain without success.
/// `Exhausted` keeps the last error per strategy category for the
/// degraded envelope.
#[derive(Debug)]
pub enum ChainFailure {
    NotFound,
    Exhausted {
        json_error: Option<String>,
        feed_error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_is_terminal() {
        assert!(FetchError::NotFound.is_terminal());
        assert!(!FetchError::Blocked("HTTP 403".into()).is_terminal());
        assert!(!FetchError::Timeout.is_terminal());
        assert!(!FetchError::Parse("bad json".into()).is_terminal());
        assert!(!FetchError::Status(500).is_terminal());
    }
}
