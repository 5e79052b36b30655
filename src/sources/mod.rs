//! Source adapters and fan-out plumbing.
//!
//! Each upstream (marketplace, forum, video platform, review site) exposes
//! the same operation: fetch raw review items for a query. Adapters are
//! best-effort plain-HTTP collectors — no browser automation — and every
//! failure is a typed `SourceError` that the aggregation layer degrades to
//! an empty source rather than a pipeline error.

pub mod forum;
pub mod marketplace;
pub mod review_site;
pub mod video;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::models::{RawReview, Source};

/// Reviews are clipped to this many characters before analysis.
pub const MAX_TEXT_LEN: usize = 1500;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("upstream refused the request: {0}")]
    Blocked(String),
    #[error("{0} is not configured")]
    MissingCredential(&'static str),
}

/// Per-source credentials/config resolved once at startup.
#[derive(Clone, Default)]
pub struct SourceConfig {
    pub youtube_api_key: Option<String>,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        SourceConfig {
            youtube_api_key: std::env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Dispatch one fetch to the adapter for `source`.
pub async fn fetch_source(
    http: &reqwest::Client,
    config: &SourceConfig,
    source: Source,
    query: &str,
    limit: usize,
) -> Result<Vec<RawReview>, SourceError> {
    match source {
        Source::Video => video::fetch(http, config.youtube_api_key.as_deref(), query, limit).await,
        Source::Marketplace => marketplace::fetch(http, query, limit).await,
        Source::Forum => forum::fetch(http, query, limit).await,
        Source::ReviewSite => review_site::fetch(http, query, limit).await,
    }
}

/// Bounded retry with doubling backoff around one adapter invocation.
///
/// A missing credential is permanent and returned immediately; everything
/// else gets another shot. An `Ok(vec![])` is a valid (empty) result, not a
/// retryable failure.
pub async fn fetch_with_retry<F, Fut>(
    source: Source,
    attempts: u32,
    mut op: F,
) -> Result<Vec<RawReview>, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<RawReview>, SourceError>>,
{
    let mut delay = Duration::from_millis(500);
    let mut last_err = SourceError::Parse("no attempts made".into());

    for attempt in 1..=attempts.max(1) {
        if attempt > 1 {
            sleep(delay).await;
            delay *= 2;
        }
        match op().await {
            Ok(items) => return Ok(items),
            Err(e @ SourceError::MissingCredential(_)) => return Err(e),
            Err(e) => {
                eprintln!("⚠️ [{}] attempt {}/{} failed: {}", source, attempt, attempts, e);
                last_err = e;
            }
        }
    }
    Err(last_err)
}

/// Clip a review text to the analysis cap, on a char boundary.
pub fn clip_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LEN {
        text.to_string()
    } else {
        text.chars().take(MAX_TEXT_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(Source::Forum, 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SourceError::Parse("flaky".into()))
                } else {
                    Ok(vec![RawReview::new("a", "long enough review text here", 0.0, "2024-01-01")])
                }
            }
        })
        .await;
        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(Source::Forum, 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Parse("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credential_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(Source::Video, 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::MissingCredential("YOUTUBE_API_KEY")) }
        })
        .await;
        assert!(matches!(result, Err(SourceError::MissingCredential(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_result_is_not_a_failure() {
        let result = fetch_with_retry(Source::Marketplace, 2, || async { Ok(vec![]) }).await;
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let long = "é".repeat(MAX_TEXT_LEN + 10);
        let clipped = clip_text(&long);
        assert_eq!(clipped.chars().count(), MAX_TEXT_LEN);
    }
}
