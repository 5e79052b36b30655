//! Two-tier sentiment classifier.
//!
//! Tier 1 asks the LLM (context/sarcasm aware, multilingual); any failure
//! there falls through silently to tier 2, a deterministic keyword +
//! lexical-polarity analysis. `classify` never fails: the worst case is a
//! neutral verdict tagged `method = error`.
//!
//! Text content deliberately dominates over the numeric rating — ratings are
//! frequently absent, source-specific (stars vs upvotes) or mismatched with
//! the text; the rating is only the tie-breaker of last resort.

use once_cell::sync::Lazy;

use crate::lexicon;
use crate::models::{round2, AnalysisMethod, Sentiment, SentimentVerdict};
use crate::openai::OpenAiClient;

static NEGATIVE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "disappointed", "frustrat", "terrible", "awful", "horrible", "worst",
        "broken", "defective", "poor", "bad", "never", "waste", "useless",
        "angry", "annoying", "annoyed", "upset", "unhappy", "unsatisfied",
        "misleading", "lied", "fake", "scam", "fraud", "avoid", "warning",
        "regret", "hate", "disappoint", "not recommend", "don't buy",
        "cheap", "poorly made", "fell apart", "uncomfortable", "painful",
    ]
});

static POSITIVE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "excellent", "amazing", "love", "perfect", "great", "awesome",
        "fantastic", "wonderful", "best", "recommend", "happy", "satisfied",
        "quality", "comfortable", "beautiful", "impressed", "exceeded",
        "worth", "favorite", "highly recommend", "outstanding", "superb",
        "pleased", "delighted", "brilliant", "sturdy", "durable", "stylish",
    ]
});

/// Process-wide classifier, constructed once at startup and injected into
/// the aggregation path (no hidden singleton; tests substitute `None`).
#[derive(Clone)]
pub struct SentimentAnalyzer {
    openai: Option<OpenAiClient>,
}

impl SentimentAnalyzer {
    pub fn new(openai: Option<OpenAiClient>) -> Self {
        SentimentAnalyzer { openai }
    }

    /// Classify one review text, with the numeric rating as a last-resort
    /// tie-breaker. Never fails.
    pub async fn classify(&self, text: &str, rating: Option<f32>) -> SentimentVerdict {
        if text.trim().is_empty() {
            return SentimentVerdict::unscorable();
        }

        if let Some(client) = &self.openai {
            match client.classify_sentiment(text).await {
                Ok(ai) => return verdict_from_ai(&ai.sentiment, ai.confidence),
                Err(e) => {
                    eprintln!("⚠️ AI sentiment analysis failed, using fallback: {}", e);
                }
            }
        }

        classify_keywords(text, rating)
    }
}

/// Map a tier-1 classification into a verdict. Polarity is derived from
/// sentiment + confidence; subjectivity is not computed by this tier.
fn verdict_from_ai(sentiment: &str, confidence: f64) -> SentimentVerdict {
    let confidence = confidence.clamp(0.0, 1.0);
    let (sentiment, polarity) = match sentiment {
        "positive" => (Sentiment::Positive, 0.3 + confidence * 0.7),
        "negative" => (Sentiment::Negative, -(0.3 + confidence * 0.7)),
        _ => (Sentiment::Neutral, 0.0),
    };
    SentimentVerdict {
        sentiment,
        polarity: round2(polarity),
        subjectivity: 0.5,
        confidence: Some(round2(confidence)),
        method: AnalysisMethod::Ai,
    }
}

/// Tier-2 analysis: keyword counts decide first, the lexical score refines
/// polarity, the rating only breaks a genuinely neutral text. Pure function.
pub fn classify_keywords(text: &str, rating: Option<f32>) -> SentimentVerdict {
    let text_lower = text.to_lowercase();

    let negative_count = NEGATIVE_KEYWORDS.iter().filter(|k| text_lower.contains(*k)).count();
    let positive_count = POSITIVE_KEYWORDS.iter().filter(|k| text_lower.contains(*k)).count();

    let lex = lexicon::score(text);
    let mut polarity = lex.polarity;

    // Decision ladder; first matching rule wins.
    let sentiment = if positive_count > negative_count + 2 {
        polarity = polarity.max(0.3);
        Sentiment::Positive
    } else if negative_count > positive_count + 2 {
        polarity = polarity.min(-0.3);
        Sentiment::Negative
    } else if positive_count > negative_count {
        polarity = polarity.max(0.2);
        Sentiment::Positive
    } else if negative_count > positive_count {
        polarity = polarity.min(-0.2);
        Sentiment::Negative
    } else if polarity > 0.05 {
        Sentiment::Positive
    } else if polarity < -0.05 {
        Sentiment::Negative
    } else if let Some(rating) = rating {
        if rating <= 2.0 {
            polarity = -0.3;
            Sentiment::Negative
        } else if rating >= 4.0 {
            polarity = 0.3;
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    } else {
        Sentiment::Neutral
    };

    SentimentVerdict {
        sentiment,
        polarity: round2(polarity),
        subjectivity: round2(lex.subjectivity),
        confidence: None,
        method: AnalysisMethod::KeywordTextblob,
    }
}
