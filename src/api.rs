// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::counter;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::ProxyConfig;
use crate::error::ChainFailure;
use crate::fallback;
use crate::fetch;
use crate::fetch::types::{ChainOutcome, Post, Source};
use crate::request::{sanitize, RawQuery, SanitizedRequest, Sort};

/// Shared caches may serve slightly stale data for 5 minutes and keep
/// revalidating for up to 10.
const CACHE_CONTROL_SUCCESS: &str = "public, s-maxage=300, stale-while-revalidate=600";

#[derive(Clone)]
pub struct AppState {
    config: Arc<ProxyConfig>,
}

pub fn create_router(config: ProxyConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/posts", get(get_posts))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostsOk {
    success: bool,
    subreddit: String,
    sort: Sort,
    source: Source,
    count: usize,
    posts: Vec<Post>,
    fetched_at: u64,
}

#[derive(Serialize)]
struct StrategyErrors {
    json: Option<String>,
    feed: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostsDegraded {
    success: bool,
    subreddit: String,
    sort: Sort,
    errors: StrategyErrors,
    fallback: bool,
    count: usize,
    posts: Vec<Post>,
    fetched_at: u64,
}

#[derive(Serialize)]
struct NotFoundBody {
    success: bool,
    error: String,
}

/// GET /posts?subreddit=&limit=&sort=
///
/// Sanitization happens before any outbound call; an invalid request
/// never reaches the chain.
async fn get_posts(State(state): State<AppState>, Query(raw): Query<RawQuery>) -> Response {
    let req = match sanitize(raw) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let strategies = fetch::default_strategies(&state.config);
    match fetch::run_chain(&strategies, &req).await {
        Ok(outcome) => success_response(&req, outcome),
        Err(ChainFailure::NotFound) => not_found_response(&req),
        Err(ChainFailure::Exhausted {
            json_error,
            feed_error,
        }) => degraded_response(&req, json_error, feed_error),
    }
}

fn success_response(req: &SanitizedRequest, outcome: ChainOutcome) -> Response {
    let body = PostsOk {
        success: true,
        subreddit: req.subreddit.clone(),
        sort: req.sort,
        source: outcome.source,
        count: outcome.posts.len(),
        posts: outcome.posts,
        fetched_at: current_unix(),
    };
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, CACHE_CONTROL_SUCCESS)],
        Json(body),
    )
        .into_response()
}

fn not_found_response(req: &SanitizedRequest) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            success: false,
            error: format!("subreddit r/{} not found", req.subreddit),
        }),
    )
        .into_response()
}

/// Degraded envelope: 503 with clearly-labeled sample data so the
/// dashboard never receives an empty or broken payload.
pub fn degraded_response(
    req: &SanitizedRequest,
    json_error: Option<String>,
    feed_error: Option<String>,
) -> Response {
    counter!("proxy_fallback_total").increment(1);

    let posts = fallback::sample_posts(&req.subreddit, req.limit);
    let body = PostsDegraded {
        success: false,
        subreddit: req.subreddit.clone(),
        sort: req.sort,
        errors: StrategyErrors {
            json: json_error,
            feed: feed_error,
        },
        fallback: true,
        count: posts.len(),
        posts,
        fetched_at: current_unix(),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

fn current_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
