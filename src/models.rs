//! Core data model for the review pipeline.
//!
//! Every entity here is request-scoped: adapters produce `RawReview`s, the
//! classifier attaches a `SentimentVerdict`, and the aggregation engine
//! carries `AnalyzedReview`s into `AggregateStatistics`. Nothing is persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Upstream review source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Marketplace,
    Forum,
    Video,
    ReviewSite,
}

impl Source {
    /// All sources in fan-out invocation order.
    pub const ALL: [Source; 4] = [
        Source::Video,
        Source::Marketplace,
        Source::Forum,
        Source::ReviewSite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Marketplace => "marketplace",
            Source::Forum => "forum",
            Source::Video => "video",
            Source::ReviewSite => "review_site",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "marketplace" => Ok(Source::Marketplace),
            "forum" => Ok(Source::Forum),
            "video" => Ok(Source::Video),
            "review_site" => Ok(Source::ReviewSite),
            _ => Err(()),
        }
    }
}

/// Normalized sentiment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Which tier produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// LLM classification (tier 1).
    Ai,
    /// Keyword + lexical polarity fallback (tier 2).
    KeywordTextblob,
    /// Classifier could not run at all (e.g. empty text).
    Error,
}

/// Unnormalized item as returned by a source adapter.
///
/// `text` is the only field guaranteed non-empty; adapters discard items
/// below their per-source minimum length. `rating` is 0.0 when the source
/// has no numeric rating. The optional fields are source-specific extras
/// (video title, subreddit, verified-purchase flag, ...).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RawReview {
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub rating: f32,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Forum upvote score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl RawReview {
    /// Minimal review with only the guaranteed fields set.
    pub fn new(author: impl Into<String>, text: impl Into<String>, rating: f32, date: impl Into<String>) -> Self {
        RawReview {
            author: author.into(),
            text: text.into(),
            rating,
            date: date.into(),
            title: None,
            url: None,
            score: None,
            subreddit: None,
            video_title: None,
            video_url: None,
            channel: None,
            likes: None,
            verified: None,
        }
    }
}

/// Normalized sentiment verdict produced by the classifier.
///
/// Polarity and the categorical sentiment are adjusted by related but
/// independent rules, so `sentiment = positive` with `polarity < 0` is
/// representable. Consumers treat the pair as a joint contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SentimentVerdict {
    pub sentiment: Sentiment,
    /// Signed direction/strength in [-1.0, 1.0], rounded to 2 decimals.
    pub polarity: f64,
    /// Opinion- vs fact-based language in [0.0, 1.0]; 0.5 when not computed.
    pub subjectivity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub method: AnalysisMethod,
}

impl SentimentVerdict {
    /// Verdict for text the classifier could not score at all.
    pub fn unscorable() -> Self {
        SentimentVerdict {
            sentiment: Sentiment::Neutral,
            polarity: 0.0,
            subjectivity: 0.0,
            confidence: None,
            method: AnalysisMethod::Error,
        }
    }
}

/// A raw review enriched with its verdict and source tag. The unit flowing
/// through aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzedReview {
    #[serde(flatten)]
    pub review: RawReview,
    pub sentiment: SentimentVerdict,
    pub source: Source,
}

/// Cross-source statistics over one merged review collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AggregateStatistics {
    pub total_reviews: usize,
    #[schema(value_type = Object)]
    pub per_source_counts: BTreeMap<Source, usize>,
    /// Sums to `total_reviews`.
    #[schema(value_type = Object)]
    pub sentiment_distribution: BTreeMap<Sentiment, usize>,
    pub average_polarity: f64,
    pub average_subjectivity: f64,
    /// Averaged over reviews with `rating > 0` only; 0 when none exist.
    pub average_rating: f64,
}

/// Round to 2 decimal places, matching the wire format everywhere.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to 1 decimal place (percentages).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
