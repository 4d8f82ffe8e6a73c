// src/request.rs
//
// Input Normalizer: raw query parameters -> SanitizedRequest.
// Everything downstream (chain, providers, envelopes) only ever sees the
// sanitized form.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MAX_SUBREDDIT_LEN: usize = 50;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 25;

/// Raw inbound query. `limit` arrives string-encoded; tolerant parsing
/// happens in `sanitize`.
#[derive(Debug, Default, Deserialize)]
pub struct RawQuery {
    pub subreddit: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Hot,
    New,
    Top,
    Rising,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Top => "top",
            Sort::Rising => "rising",
        }
    }

    /// Allow-list only; anything unknown silently falls back to hot.
    fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("new") => Sort::New,
            Some("top") => Sort::Top,
            Some("rising") => Sort::Rising,
            _ => Sort::Hot,
        }
    }
}

/// Validated request parameters. Created once per request, immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct SanitizedRequest {
    pub subreddit: String,
    pub limit: u32,
    pub sort: Sort,
}

pub fn sanitize(raw: RawQuery) -> Result<SanitizedRequest, ValidationError> {
    let subreddit: String = raw
        .subreddit
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_SUBREDDIT_LEN)
        .collect();
    if subreddit.is_empty() {
        return Err(ValidationError::MissingSubreddit);
    }

    let limit = raw
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(MIN_LIMIT, MAX_LIMIT) as u32;

    let sort = Sort::from_param(raw.sort.as_deref());

    Ok(SanitizedRequest {
        subreddit,
        limit,
        sort,
    })
}
