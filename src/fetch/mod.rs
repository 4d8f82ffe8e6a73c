// src/fetch/mod.rs
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::config::ProxyConfig;
use crate::error::{ChainFailure, FetchError};
use crate::request::SanitizedRequest;
use types::{ChainOutcome, Source, SourceStrategy};

use providers::atom_feed::AtomFeedStrategy;
use providers::json_api::JsonApiStrategy;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("proxy_attempts_total", "Outbound fetch attempts.");
        describe_counter!(
            "proxy_attempt_errors_total",
            "Attempts that failed or produced no posts."
        );
        describe_counter!(
            "proxy_chain_exhausted_total",
            "Requests where every live strategy failed."
        );
        describe_counter!(
            "proxy_fallback_total",
            "Degraded responses served from sample data."
        );
        describe_histogram!("proxy_attempt_ms", "Single attempt duration in milliseconds.");
        describe_histogram!("proxy_parse_ms", "Body parse time in milliseconds.");
        describe_gauge!(
            "proxy_last_success_ts",
            "Unix ts of the last successful live fetch."
        );
    });
}

/// Map an upstream HTTP status onto the attempt taxonomy. 403/429 mean
/// the platform is blocking this profile; 404 is a definitive answer.
pub fn classify_status(status: u16) -> Result<(), FetchError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(FetchError::NotFound),
        403 | 429 => Err(FetchError::Blocked(format!("HTTP {status}"))),
        other => Err(FetchError::Status(other)),
    }
}

/// The production chain, in priority order: JSON endpoints first (richer
/// data), the Atom feed last (leaner but more tolerant of blocking).
pub fn default_strategies(cfg: &ProxyConfig) -> Vec<Box<dyn SourceStrategy>> {
    vec![
        Box::new(JsonApiStrategy::primary(cfg)),
        Box::new(JsonApiStrategy::alternate(cfg)),
        Box::new(AtomFeedStrategy::new(cfg)),
    ]
}

/// Try strategies one at a time until one yields usable posts.
///
/// An empty-but-well-formed listing counts as a failed attempt. A
/// terminal error (upstream 404) stops the chain immediately; everything
/// else is recorded into its category slot and the next strategy runs.
pub async fn run_chain(
    strategies: &[Box<dyn SourceStrategy>],
    req: &SanitizedRequest,
) -> Result<ChainOutcome, ChainFailure> {
    ensure_metrics_described();

    let mut json_error: Option<String> = None;
    let mut feed_error: Option<String> = None;

    for strategy in strategies {
        let t0 = std::time::Instant::now();
        counter!("proxy_attempts_total").increment(1);

        let result = strategy.attempt(req).await;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("proxy_attempt_ms").record(ms);

        match result {
            Ok(posts) if !posts.is_empty() => {
                gauge!("proxy_last_success_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
                tracing::debug!(
                    strategy = strategy.name(),
                    subreddit = %req.subreddit,
                    count = posts.len(),
                    "strategy succeeded"
                );
                return Ok(ChainOutcome {
                    source: strategy.source(),
                    posts,
                });
            }
            Ok(_) => {
                counter!("proxy_attempt_errors_total").increment(1);
                record_error(
                    strategy.source(),
                    "upstream returned no posts".to_string(),
                    &mut json_error,
                    &mut feed_error,
                );
            }
            Err(e) if e.is_terminal() => {
                tracing::info!(
                    strategy = strategy.name(),
                    subreddit = %req.subreddit,
                    "upstream reports not found"
                );
                return Err(ChainFailure::NotFound);
            }
            Err(e) => {
                counter!("proxy_attempt_errors_total").increment(1);
                tracing::warn!(
                    error = %e,
                    strategy = strategy.name(),
                    subreddit = %req.subreddit,
                    "strategy failed"
                );
                record_error(strategy.source(), e.to_string(), &mut json_error, &mut feed_error);
            }
        }
    }

    counter!("proxy_chain_exhausted_total").increment(1);
    Err(ChainFailure::Exhausted {
        json_error,
        feed_error,
    })
}

fn record_error(
    source: Source,
    message: String,
    json_error: &mut Option<String>,
    feed_error: &mut Option<String>,
) {
    match source {
        Source::Json => *json_error = Some(message),
        Source::Rss => *feed_error = Some(message),
        // Sample data never runs inside the chain.
        Source::Sample => {}
    }
}
