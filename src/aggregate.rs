//! Aggregation engine: fan-out to every source, fan-in to one scored
//! collection plus cross-source statistics.
//!
//! Sources are independent and unreliable. One adapter failing (or timing
//! out, or returning nothing) degrades that source to an empty list and the
//! aggregation keeps going; only all four coming back empty is an error.
//! Merged output order is source-invocation order, never interleaved.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::models::{
    round2, AggregateStatistics, AnalyzedReview, RawReview, Sentiment, Source,
};
use crate::sentiment::SentimentAnalyzer;
use crate::sources::{self, SourceConfig, SourceError};

/// Hard deadline per source fetch (each adapter also has reqwest's own
/// timeout underneath).
const SOURCE_TIMEOUT: Duration = Duration::from_secs(20);
/// Retry attempts per source.
const SOURCE_ATTEMPTS: u32 = 2;
/// Politeness pause between successive source calls. Tunable; affects
/// latency only, never results.
const PACING_BASE: Duration = Duration::from_millis(800);
const PACING_JITTER_MS: u64 = 400;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no reviews found from any source")]
    NoDataFound,
}

/// Fan-in result: per-source buckets (invocation order) plus the combined
/// statistics.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub per_source: Vec<(Source, Vec<AnalyzedReview>)>,
    pub stats: AggregateStatistics,
}

impl AggregateOutcome {
    /// All reviews merged in source-invocation order.
    pub fn all_reviews(&self) -> Vec<AnalyzedReview> {
        self.per_source.iter().flat_map(|(_, r)| r.iter().cloned()).collect()
    }
}

/// Run the full aggregation for one query against the live adapters.
pub async fn aggregate(
    http: &reqwest::Client,
    config: &SourceConfig,
    analyzer: &SentimentAnalyzer,
    query: &str,
    per_source_limit: usize,
) -> Result<AggregateOutcome, AggregateError> {
    let pacing = PACING_BASE + Duration::from_millis(rand::random::<u64>() % PACING_JITTER_MS);

    aggregate_with(analyzer, pacing, |source| {
        let http = http.clone();
        let config = config.clone();
        let query = query.to_string();
        async move {
            let fetched = timeout(
                SOURCE_TIMEOUT,
                sources::fetch_with_retry(source, SOURCE_ATTEMPTS, || {
                    sources::fetch_source(&http, &config, source, &query, per_source_limit)
                }),
            )
            .await;
            match fetched {
                Ok(result) => result,
                Err(_) => Err(SourceError::Parse(format!("{} fetch exceeded deadline", source))),
            }
        }
    })
    .await
}

/// Core fan-out/fan-in over an injectable fetch operation. A failed fetch
/// degrades to an empty bucket for that source only.
pub async fn aggregate_with<F, Fut>(
    analyzer: &SentimentAnalyzer,
    pacing: Duration,
    mut fetch: F,
) -> Result<AggregateOutcome, AggregateError>
where
    F: FnMut(Source) -> Fut,
    Fut: Future<Output = Result<Vec<RawReview>, SourceError>>,
{
    let mut per_source = Vec::with_capacity(Source::ALL.len());
    let mut any = false;

    for (i, source) in Source::ALL.into_iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            sleep(pacing).await;
        }

        let raw = match fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                eprintln!("⚠️ {} fetch failed, continuing without it: {}", source, e);
                Vec::new()
            }
        };

        let mut analyzed = Vec::with_capacity(raw.len());
        for review in raw {
            let rating = (review.rating > 0.0).then_some(review.rating);
            let verdict = analyzer.classify(&review.text, rating).await;
            analyzed.push(AnalyzedReview { review, sentiment: verdict, source });
        }

        any = any || !analyzed.is_empty();
        per_source.push((source, analyzed));
    }

    if !any {
        return Err(AggregateError::NoDataFound);
    }

    let all: Vec<&AnalyzedReview> = per_source.iter().flat_map(|(_, r)| r.iter()).collect();
    let stats = compute_statistics(&all);

    Ok(AggregateOutcome { per_source, stats })
}

/// Single-pass statistics over a merged collection. `average_rating` only
/// counts reviews with a real rating (`rating > 0`) and is 0 when none have
/// one.
pub fn compute_statistics(reviews: &[&AnalyzedReview]) -> AggregateStatistics {
    let mut per_source_counts = std::collections::BTreeMap::new();
    for source in Source::ALL {
        per_source_counts.insert(source, 0usize);
    }
    let mut sentiment_distribution = std::collections::BTreeMap::new();
    for sentiment in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
        sentiment_distribution.insert(sentiment, 0usize);
    }

    let mut polarity_sum = 0.0;
    let mut subjectivity_sum = 0.0;
    let mut rating_sum = 0.0;
    let mut rating_count = 0usize;

    for review in reviews {
        *per_source_counts.entry(review.source).or_insert(0) += 1;
        *sentiment_distribution.entry(review.sentiment.sentiment).or_insert(0) += 1;
        polarity_sum += review.sentiment.polarity;
        subjectivity_sum += review.sentiment.subjectivity;
        if review.review.rating > 0.0 {
            rating_sum += review.review.rating as f64;
            rating_count += 1;
        }
    }

    let total = reviews.len();
    AggregateStatistics {
        total_reviews: total,
        per_source_counts,
        sentiment_distribution,
        average_polarity: if total > 0 { round2(polarity_sum / total as f64) } else { 0.0 },
        average_subjectivity: if total > 0 { round2(subjectivity_sum / total as f64) } else { 0.0 },
        average_rating: if rating_count > 0 {
            round2(rating_sum / rating_count as f64)
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMethod, SentimentVerdict};

    fn analyzer() -> SentimentAnalyzer {
        SentimentAnalyzer::new(None)
    }

    fn raw(text: &str, rating: f32) -> RawReview {
        RawReview::new("tester", text, rating, "2024-01-01")
    }

    fn analyzed(source: Source, sentiment: Sentiment, polarity: f64, rating: f32) -> AnalyzedReview {
        AnalyzedReview {
            review: raw("some review text that is long enough", rating),
            sentiment: SentimentVerdict {
                sentiment,
                polarity,
                subjectivity: 0.5,
                confidence: None,
                method: AnalysisMethod::KeywordTextblob,
            },
            source,
        }
    }

    #[tokio::test]
    async fn one_healthy_source_is_enough() {
        let analyzer = analyzer();
        let outcome = aggregate_with(&analyzer, Duration::ZERO, |source| async move {
            if source == Source::Forum {
                Ok(vec![
                    raw("Excellent boots, love the quality and comfort.", 0.0),
                    raw("Terrible stitching, fell apart within a month.", 0.0),
                    raw("Great value, highly recommend these.", 0.0),
                    raw("The leather is beautiful and very durable.", 0.0),
                    raw("Worst purchase I have made, total waste.", 0.0),
                ])
            } else {
                Err(SourceError::Parse("upstream down".into()))
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome.stats.total_reviews, 5);
        assert_eq!(outcome.stats.per_source_counts[&Source::Forum], 5);
        assert_eq!(outcome.stats.per_source_counts[&Source::Video], 0);
        assert_eq!(outcome.stats.per_source_counts[&Source::Marketplace], 0);
        assert_eq!(outcome.stats.per_source_counts[&Source::ReviewSite], 0);
    }

    #[tokio::test]
    async fn all_sources_empty_is_no_data() {
        let analyzer = analyzer();
        let result = aggregate_with(&analyzer, Duration::ZERO, |source| async move {
            if source == Source::Video {
                Err(SourceError::MissingCredential("YOUTUBE_API_KEY"))
            } else {
                Ok(vec![])
            }
        })
        .await;
        assert!(matches!(result, Err(AggregateError::NoDataFound)));
    }

    #[tokio::test]
    async fn merged_order_follows_invocation_order() {
        let analyzer = analyzer();
        let outcome = aggregate_with(&analyzer, Duration::ZERO, |source| async move {
            Ok(vec![raw(&format!("A perfectly ordinary review from {}.", source), 0.0)])
        })
        .await
        .unwrap();

        let sources: Vec<Source> = outcome.all_reviews().iter().map(|r| r.source).collect();
        assert_eq!(sources, Source::ALL.to_vec());
    }

    #[tokio::test]
    async fn ratings_are_forwarded_to_the_classifier() {
        let analyzer = analyzer();
        // Lexically neutral text: only the 5-star rating can make it positive.
        let outcome = aggregate_with(&analyzer, Duration::ZERO, |source| async move {
            if source == Source::Marketplace {
                Ok(vec![raw("It is a boot.", 5.0)])
            } else {
                Ok(vec![])
            }
        })
        .await
        .unwrap();

        let reviews = outcome.all_reviews();
        assert_eq!(reviews[0].sentiment.sentiment, Sentiment::Positive);
    }

    #[test]
    fn distribution_sums_to_total() {
        let reviews = vec![
            analyzed(Source::Forum, Sentiment::Positive, 0.5, 0.0),
            analyzed(Source::Forum, Sentiment::Positive, 0.3, 0.0),
            analyzed(Source::Marketplace, Sentiment::Negative, -0.4, 0.0),
            analyzed(Source::Video, Sentiment::Neutral, 0.0, 0.0),
        ];
        let refs: Vec<&AnalyzedReview> = reviews.iter().collect();
        let stats = compute_statistics(&refs);

        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.sentiment_distribution[&Sentiment::Positive], 2);
        assert_eq!(stats.sentiment_distribution[&Sentiment::Negative], 1);
        assert_eq!(stats.sentiment_distribution[&Sentiment::Neutral], 1);
        let sum: usize = stats.sentiment_distribution.values().sum();
        assert_eq!(sum, stats.total_reviews);
    }

    #[test]
    fn average_rating_ignores_unrated_reviews() {
        let reviews = vec![
            analyzed(Source::Marketplace, Sentiment::Positive, 0.5, 5.0),
            analyzed(Source::Forum, Sentiment::Positive, 0.5, 0.0),
            analyzed(Source::Marketplace, Sentiment::Neutral, 0.0, 3.0),
            analyzed(Source::Video, Sentiment::Neutral, 0.0, 0.0),
        ];
        let refs: Vec<&AnalyzedReview> = reviews.iter().collect();
        let stats = compute_statistics(&refs);
        assert_eq!(stats.average_rating, 4.0);
    }

    #[test]
    fn no_rated_reviews_means_zero_average() {
        let reviews = vec![analyzed(Source::Video, Sentiment::Positive, 0.6, 0.0)];
        let refs: Vec<&AnalyzedReview> = reviews.iter().collect();
        assert_eq!(compute_statistics(&refs).average_rating, 0.0);
    }

    #[test]
    fn averages_are_rounded() {
        let reviews = vec![
            analyzed(Source::Forum, Sentiment::Positive, 0.333, 0.0),
            analyzed(Source::Forum, Sentiment::Positive, 0.333, 0.0),
            analyzed(Source::Forum, Sentiment::Positive, 0.334, 0.0),
        ];
        let refs: Vec<&AnalyzedReview> = reviews.iter().collect();
        let stats = compute_statistics(&refs);
        assert_eq!(stats.average_polarity, 0.33);
    }
}
