// src/fetch/providers/json_api.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::ProxyConfig;
use crate::error::FetchError;
use crate::fetch::classify_status;
use crate::fetch::types::{Post, Source, SourceStrategy};
use crate::request::SanitizedRequest;

// Data-center IPs with default user agents get 403'd; a browser-like
// profile survives far more often. The alternate profile pairs the old.
// domain with a different browser string.
const PRIMARY_BASE: &str = "https://www.reddit.com";
const ALTERNATE_BASE: &str = "https://old.reddit.com";
const PRIMARY_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ALTERNATE_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    kind: Option<String>,
    data: RawPost,
}

/// Platform post record as the JSON endpoint ships it. Everything is
/// optional; defaults are resolved in `normalize_post` and nowhere else.
#[derive(Debug, Default, Deserialize)]
struct RawPost {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    subreddit: Option<String>,
    ups: Option<i64>,
    score: Option<i64>,
    upvote_ratio: Option<f64>,
    num_comments: Option<i64>,
    created_utc: Option<f64>,
    permalink: Option<String>,
    url: Option<String>,
    selftext: Option<String>,
    thumbnail: Option<String>,
    link_flair_text: Option<String>,
    over_18: Option<bool>,
    stickied: Option<bool>,
    promoted: Option<bool>,
}

pub struct JsonApiStrategy {
    name: &'static str,
    base: &'static str,
    client: reqwest::Client,
    cfg: ProxyConfig,
}

impl JsonApiStrategy {
    pub fn primary(cfg: &ProxyConfig) -> Self {
        Self::with_profile("json:www", PRIMARY_BASE, PRIMARY_UA, cfg)
    }

    pub fn alternate(cfg: &ProxyConfig) -> Self {
        Self::with_profile("json:old", ALTERNATE_BASE, ALTERNATE_UA, cfg)
    }

    fn with_profile(
        name: &'static str,
        base: &'static str,
        user_agent: &'static str,
        cfg: &ProxyConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(cfg.attempt_timeout_secs))
            .build()
            .expect("http client");
        Self {
            name,
            base,
            client,
            cfg: cfg.clone(),
        }
    }
}

#[async_trait]
impl SourceStrategy for JsonApiStrategy {
    async fn attempt(&self, req: &SanitizedRequest) -> Result<Vec<Post>, FetchError> {
        let url = format!(
            "{}/r/{}/{}.json?limit={}&raw_json=1",
            self.base,
            req.subreddit,
            req.sort.as_str(),
            req.limit
        );

        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        classify_status(resp.status().as_u16())?;

        // Blocked responses often come back 200 with an HTML challenge
        // page, so the content type is part of the classification.
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(FetchError::Blocked(format!(
                "expected JSON, got '{content_type}'"
            )));
        }

        let body = resp.text().await?;

        let t0 = std::time::Instant::now();
        let posts = parse_listing(&body, req, &self.cfg)?;
        histogram!("proxy_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn source(&self) -> Source {
        Source::Json
    }
}

pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
}

/// Parse a listing body and normalize each genuine post. Only `t3`
/// children count; promoted entries are dropped, stickied ones depending
/// on the `skip_pinned` policy.
pub fn parse_listing(
    body: &str,
    req: &SanitizedRequest,
    cfg: &ProxyConfig,
) -> Result<Vec<Post>, FetchError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("listing json: {e}")))?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        if child.kind.as_deref() != Some("t3") {
            continue;
        }
        let raw = child.data;
        if raw.promoted.unwrap_or(false) {
            continue;
        }
        if cfg.skip_pinned && raw.stickied.unwrap_or(false) {
            continue;
        }
        out.push(normalize_post(raw, &req.subreddit, cfg.selftext_max_chars));
    }
    Ok(out)
}

fn normalize_post(raw: RawPost, requested_subreddit: &str, selftext_max: usize) -> Post {
    let upvotes = raw.ups.or(raw.score).unwrap_or(0);
    let score = raw.score.or(raw.ups).unwrap_or(0);

    let permalink = raw
        .permalink
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| format!("/r/{requested_subreddit}/"));
    let url = raw
        .url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("https://www.reddit.com{permalink}"));

    Post {
        id: raw.id.unwrap_or_default(),
        title: raw.title.unwrap_or_default(),
        author: raw.author.unwrap_or_else(|| "[deleted]".to_string()),
        subreddit: raw
            .subreddit
            .unwrap_or_else(|| requested_subreddit.to_string()),
        upvotes,
        score,
        ratio: raw.upvote_ratio,
        comments: raw.num_comments.unwrap_or(0),
        created: raw.created_utc.unwrap_or(0.0),
        permalink,
        url,
        selftext: truncate_selftext(raw.selftext, selftext_max),
        thumbnail: raw.thumbnail.filter(|t| t.starts_with("http")),
        flair: raw.link_flair_text.filter(|f| !f.is_empty()),
        is_nsfw: raw.over_18.unwrap_or(false),
        is_pinned: raw.stickied.unwrap_or(false),
    }
}

/// Bounded selftext: absent or blank becomes null, anything longer than
/// the cap is cut on a char boundary.
fn truncate_selftext(selftext: Option<String>, max_chars: usize) -> Option<String> {
    let s = selftext?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > max_chars {
        Some(trimmed.chars().take(max_chars).collect())
    } else {
        Some(trimmed.to_string())
    }
}
