// src/fetch/types.rs
use serde::Serialize;

use crate::error::FetchError;
use crate::request::SanitizedRequest;

/// Where a post list ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Json,
    Rss,
    Sample,
}

/// Canonical post shape, the only one that ever leaves the service.
/// Every field is serialized on every post regardless of which source
/// produced it; optional fields show up as explicit `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub upvotes: i64,
    pub score: i64,
    pub ratio: Option<f64>,
    pub comments: i64,
    pub created: f64,
    pub permalink: String,
    pub url: String,
    pub selftext: Option<String>,
    pub thumbnail: Option<String>,
    pub flair: Option<String>,
    pub is_nsfw: bool,
    pub is_pinned: bool,
}

/// One concrete way of retrieving posts (specific URL + header profile).
/// A strategy makes exactly one outbound attempt per call; classification
/// of the failure is the strategy's job, reacting to it is the chain's.
#[async_trait::async_trait]
pub trait SourceStrategy: Send + Sync {
    async fn attempt(&self, req: &SanitizedRequest) -> Result<Vec<Post>, FetchError>;
    fn name(&self) -> &'static str;
    fn source(&self) -> Source;
}

/// First successful (non-empty) result of the chain, source order
/// preserved.
#[derive(Debug)]
pub struct ChainOutcome {
    pub source: Source,
    pub posts: Vec<Post>,
}
