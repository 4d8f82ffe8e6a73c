// src/fetch/providers/atom_feed.rs
//
// Last-resort live strategy: the public Atom feed. Leaner than the JSON
// endpoint (no selftext, thumbnail, or flair) but served to feed readers
// that the platform rarely blocks.

use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

use crate::config::ProxyConfig;
use crate::error::FetchError;
use crate::fetch::classify_status;
use crate::fetch::types::{Post, Source, SourceStrategy};
use crate::request::SanitizedRequest;

const FEED_UA: &str = "subreddit-proxy/0.1 (feed reader; posts dashboard)";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    title: Option<TextNode>,
    author: Option<Author>,
    link: Option<Link>,
    published: Option<String>,
    updated: Option<String>,
    content: Option<TextNode>,
}

// title/content carry a type attribute, so plain String won't do.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub struct AtomFeedStrategy {
    client: reqwest::Client,
}

impl AtomFeedStrategy {
    pub fn new(cfg: &ProxyConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(FEED_UA)
            .timeout(Duration::from_secs(cfg.attempt_timeout_secs))
            .build()
            .expect("http client");
        Self { client }
    }
}

#[async_trait]
impl SourceStrategy for AtomFeedStrategy {
    async fn attempt(&self, req: &SanitizedRequest) -> Result<Vec<Post>, FetchError> {
        // The feed is always the hot listing; the requested sort only
        // applies to the JSON endpoints.
        let url = format!("https://www.reddit.com/r/{}/hot.rss", req.subreddit);

        let resp = self.client.get(&url).send().await?;
        classify_status(resp.status().as_u16())?;

        let body = resp.text().await?;

        let t0 = std::time::Instant::now();
        let posts = parse_feed(&body, &req.subreddit)?;
        histogram!("proxy_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "atom"
    }

    fn source(&self) -> Source {
        Source::Rss
    }
}

/// Blocked requests tend to get an HTML challenge page with a 200, not a
/// feed. Treat those as a failed attempt, never as a zero-post success.
pub fn looks_like_html(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    lowered.contains("<html") || !lowered.contains("<entry")
}

/// Parse an Atom body into canonical posts. Fields this format cannot
/// carry (`selftext`, `thumbnail`, `flair`, `ratio`) stay null; score and
/// comment counts are pattern-extracted from the entry content when the
/// feed embeds them as text, defaulting to 0.
pub fn parse_feed(body: &str, subreddit: &str) -> Result<Vec<Post>, FetchError> {
    if looks_like_html(body) {
        return Err(FetchError::Blocked(
            "HTML page where a feed was expected".to_string(),
        ));
    }

    let feed: Feed =
        from_str(body).map_err(|e| FetchError::Parse(format!("atom feed: {e}")))?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for (idx, entry) in feed.entries.into_iter().enumerate() {
        let title = normalize_fragment(entry.title.and_then(|t| t.value).as_deref().unwrap_or(""));
        if title.is_empty() {
            continue;
        }

        let link = entry
            .link
            .and_then(|l| l.href)
            .unwrap_or_default();
        let author = entry
            .author
            .and_then(|a| a.name)
            .map(|n| strip_user_prefix(&n))
            .unwrap_or_else(|| "unknown".to_string());

        let content = entry
            .content
            .and_then(|c| c.value)
            .map(|c| normalize_fragment(&c))
            .unwrap_or_default();
        let score = extract_count(&content, points_re());
        let comments = extract_count(&content, comments_re());

        let id = extract_link_id(&link).unwrap_or_else(|| synthesize_id(&link, &title, idx));
        let created = entry
            .published
            .or(entry.updated)
            .as_deref()
            .map(parse_rfc3339_to_unix)
            .unwrap_or(0) as f64;

        let permalink = link
            .find("/r/")
            .map(|i| link[i..].to_string())
            .unwrap_or_else(|| format!("/r/{subreddit}/comments/{id}/"));
        let url = if link.is_empty() {
            format!("https://www.reddit.com{permalink}")
        } else {
            link
        };

        out.push(Post {
            id,
            title,
            author,
            subreddit: subreddit.to_string(),
            upvotes: score,
            score,
            ratio: None,
            comments,
            created,
            permalink,
            url,
            selftext: None,
            thumbnail: None,
            flair: None,
            is_nsfw: false,
            is_pinned: false,
        });
    }

    Ok(out)
}

/// Decode HTML entities and strip residual tags, then collapse
/// whitespace. Titles arrive double-escaped (XML over HTML), so one more
/// decode pass after the XML layer is required.
fn normalize_fragment(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

fn strip_user_prefix(name: &str) -> String {
    name.strip_prefix("/u/").unwrap_or(name).to_string()
}

fn points_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+points?").unwrap())
}

fn comments_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+comments?").unwrap())
}

fn extract_count(text: &str, re: &Regex) -> i64 {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn extract_link_id(link: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"/comments/([A-Za-z0-9]+)").unwrap());
    re.captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Locally-unique token for entries whose link carries no id. Not
/// globally stable; acceptable only on this last-resort path.
fn synthesize_id(link: &str, title: &str, idx: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(idx.to_le_bytes());
    let digest = hasher.finalize();
    format!("feed{:02x}{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2], digest[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_body_heuristic() {
        assert!(looks_like_html("<html><body>blocked</body></html>"));
        assert!(looks_like_html("<!DOCTYPE html><HTML>...</HTML>"));
        // no entry marker at all -> also suspicious
        assert!(looks_like_html("<feed></feed>"));
        assert!(!looks_like_html("<feed><entry><title>x</title></entry></feed>"));
    }

    #[test]
    fn counts_are_extracted_with_zero_default() {
        let content = "submitted by someone. 42 points and 7 comments so far";
        assert_eq!(extract_count(content, points_re()), 42);
        assert_eq!(extract_count(content, comments_re()), 7);
        assert_eq!(extract_count("no numbers here", points_re()), 0);
        assert_eq!(extract_count("1 point, 1 comment", points_re()), 1);
    }

    #[test]
    fn author_prefix_is_stripped() {
        assert_eq!(strip_user_prefix("/u/alice"), "alice");
        assert_eq!(strip_user_prefix("bob"), "bob");
    }

    #[test]
    fn id_comes_from_the_comments_path_segment() {
        assert_eq!(
            extract_link_id("https://www.reddit.com/r/rust/comments/1abc2d/title_slug/"),
            Some("1abc2d".to_string())
        );
        assert_eq!(extract_link_id("https://example.com/nothing"), None);
    }

    #[test]
    fn synthesized_ids_differ_per_entry() {
        let a = synthesize_id("", "same title", 0);
        let b = synthesize_id("", "same title", 1);
        assert_ne!(a, b);
        assert!(a.starts_with("feed"));
    }

    #[test]
    fn fragments_are_decoded_and_tag_stripped() {
        assert_eq!(normalize_fragment("A &amp; B"), "A & B");
        assert_eq!(normalize_fragment("&lt;b&gt;bold&lt;/b&gt; move"), "bold move");
        assert_eq!(normalize_fragment("a\n  b\t c"), "a b c");
        assert_eq!(normalize_fragment("&quot;hi&quot; &#39;there&#39;"), "\"hi\" 'there'");
    }
}
