//! Competitive comparison engine.
//!
//! Splits a "X vs Y" query, runs one aggregation per product concurrently
//! (two independent tasks, no shared accumulators), and derives a
//! head-to-head attribute breakdown from the scored reviews. The numeric
//! side of the breakdown is computed locally and is authoritative; the LLM
//! only contributes the qualitative winner/reasoning narrative and may be
//! absent entirely.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;

use crate::aggregate::{self, AggregateError};
use crate::models::{round1, round2, AnalyzedReview, Sentiment, Source};
use crate::openai::OpenAiClient;
use crate::sentiment::SentimentAnalyzer;
use crate::sources::SourceConfig;

/// Recognized comparison separators; the one occurring earliest in the
/// query wins.
pub const SEPARATORS: [&str; 5] = [" vs ", " versus ", " vs. ", " compared to ", " or "];

/// Fixed attribute set for the head-to-head breakdown. A review may match
/// several attributes; `overall_satisfaction` is reserved for reviews that
/// match none but still carry a clear sentiment.
pub const ATTRIBUTES: [(&str, &[&str]); 8] = [
    ("quality", &["quality", "craftsmanship", "construction", "materials", "built", "made"]),
    ("comfort", &["comfort", "comfortable", "cushion", "soft", "cozy", "feel"]),
    ("durability", &["durability", "durable", "last", "wear", "tough", "sturdy", "longevity"]),
    ("style", &["style", "look", "design", "aesthetic", "fashion", "appearance"]),
    ("price", &["price", "cost", "expensive", "cheap", "affordable", "value"]),
    ("value_for_money", &["value", "worth", "price", "investment", "money"]),
    ("break_in_period", &["break", "stiff", "painful", "soften", "wear in"]),
    ("overall_satisfaction", &[]),
];

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("not a comparison query; expected a separator like ' vs '")]
    NotComparisonQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriCount {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriPercentage {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

/// Per-product rollup inside a comparison.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductAnalysis {
    pub product_name: String,
    pub total_reviews: usize,
    pub sentiment_counts: TriCount,
    pub sentiment_percentages: TriPercentage,
    /// Over reviews with `rating > 0`; 0 when none.
    pub average_rating: f64,
    #[schema(value_type = Object)]
    pub per_source_counts: BTreeMap<Source, usize>,
}

/// One product's side of an attribute tally.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeSide {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeComparison {
    pub product_1: AttributeSide,
    pub product_2: AttributeSide,
    pub winner: String,
    pub reasoning: String,
}

/// Narrative layer over the numeric comparison. Counts and percentages in
/// `head_to_head_comparison` are always locally computed; the LLM only ever
/// replaces the winner/reasoning strings and the free-text fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ComparisonInsights {
    #[schema(value_type = Object)]
    pub head_to_head_comparison: BTreeMap<String, AttributeComparison>,
    pub product_1_strengths: Vec<String>,
    pub product_1_weaknesses: Vec<String>,
    pub product_2_strengths: Vec<String>,
    pub product_2_weaknesses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_positioning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_preference_insights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonSummary {
    pub total_reviews_compared: usize,
    pub query: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonResult {
    pub product_1: ProductAnalysis,
    pub product_2: ProductAnalysis,
    pub ai_insights: ComparisonInsights,
    pub comparison_summary: ComparisonSummary,
}

/// Split a comparison query on its earliest separator. Products come back
/// lowercased and trimmed.
pub fn split_comparison_query(query: &str) -> Option<(String, String)> {
    let lowered = query.to_lowercase();
    let mut earliest: Option<(usize, &str)> = None;
    for sep in SEPARATORS {
        if let Some(idx) = lowered.find(sep) {
            if earliest.map_or(true, |(best, _)| idx < best) {
                earliest = Some((idx, sep));
            }
        }
    }
    let (idx, sep) = earliest?;
    let product_1 = lowered[..idx].trim().to_string();
    let product_2 = lowered[idx + sep.len()..].trim().to_string();
    if product_1.is_empty() || product_2.is_empty() {
        return None;
    }
    Some((product_1, product_2))
}

/// Run the full comparison against the live sources.
pub async fn compare(
    http: &reqwest::Client,
    config: &SourceConfig,
    analyzer: &SentimentAnalyzer,
    openai: Option<&OpenAiClient>,
    home_brand: &str,
    query: &str,
    per_source_limit: usize,
) -> Result<ComparisonResult, CompareError> {
    let (product_1, product_2) =
        split_comparison_query(query).ok_or(CompareError::NotComparisonQuery)?;

    println!("⚔️ Comparing '{}' vs '{}'", product_1, product_2);

    // Two independent aggregations, joined before analysis; each owns its
    // own buffers. An empty side degrades to zeros, never to a failure.
    let (left, right) = tokio::join!(
        aggregate::aggregate(http, config, analyzer, &product_1, per_source_limit),
        aggregate::aggregate(http, config, analyzer, &product_2, per_source_limit),
    );
    let left_reviews = unwrap_reviews(left, &product_1);
    let right_reviews = unwrap_reviews(right, &product_2);

    Ok(build_comparison(
        &product_1,
        &product_2,
        &left_reviews,
        &right_reviews,
        openai,
        home_brand,
        query,
    )
    .await)
}

fn unwrap_reviews(
    result: Result<aggregate::AggregateOutcome, AggregateError>,
    product: &str,
) -> Vec<AnalyzedReview> {
    match result {
        Ok(outcome) => outcome.all_reviews(),
        Err(AggregateError::NoDataFound) => {
            eprintln!("⚠️ No reviews found for '{}', comparing against zeros", product);
            Vec::new()
        }
    }
}

/// Assemble the comparison from two already-aggregated review sets.
pub async fn build_comparison(
    product_1: &str,
    product_2: &str,
    left: &[AnalyzedReview],
    right: &[AnalyzedReview],
    openai: Option<&OpenAiClient>,
    home_brand: &str,
    query: &str,
) -> ComparisonResult {
    let analysis_1 = analyze_product(product_1, left);
    let analysis_2 = analyze_product(product_2, right);
    let head_to_head = attribute_breakdown(product_1, product_2, left, right);

    let mut insights = ComparisonInsights {
        head_to_head_comparison: head_to_head,
        ..Default::default()
    };

    let total = left.len() + right.len();
    if total > 0 {
        if let Some(client) = openai {
            if let Err(e) =
                apply_narrative(client, &analysis_1, &analysis_2, &mut insights, home_brand).await
            {
                eprintln!("⚠️ Comparison narrative unavailable, keeping computed summary: {}", e);
            }
        }
    }

    ComparisonResult {
        product_1: analysis_1,
        product_2: analysis_2,
        ai_insights: insights,
        comparison_summary: ComparisonSummary {
            total_reviews_compared: total,
            query: query.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
    }
}

/// Numeric rollup for one product's review set. Zero-safe throughout.
pub fn analyze_product(name: &str, reviews: &[AnalyzedReview]) -> ProductAnalysis {
    let total = reviews.len();
    let mut counts = TriCount { positive: 0, neutral: 0, negative: 0 };
    let mut per_source_counts = BTreeMap::new();
    for source in Source::ALL {
        per_source_counts.insert(source, 0usize);
    }
    let mut rating_sum = 0.0;
    let mut rating_count = 0usize;

    for review in reviews {
        match review.sentiment.sentiment {
            Sentiment::Positive => counts.positive += 1,
            Sentiment::Negative => counts.negative += 1,
            Sentiment::Neutral => counts.neutral += 1,
        }
        *per_source_counts.entry(review.source).or_insert(0) += 1;
        if review.review.rating > 0.0 {
            rating_sum += review.review.rating as f64;
            rating_count += 1;
        }
    }

    let pct = |count: usize| {
        if total > 0 {
            round1(count as f64 / total as f64 * 100.0)
        } else {
            0.0
        }
    };

    ProductAnalysis {
        product_name: name.to_string(),
        total_reviews: total,
        sentiment_percentages: TriPercentage {
            positive: pct(counts.positive),
            neutral: pct(counts.neutral),
            negative: pct(counts.negative),
        },
        sentiment_counts: counts,
        average_rating: if rating_count > 0 {
            round2(rating_sum / rating_count as f64)
        } else {
            0.0
        },
        per_source_counts,
    }
}

/// Which attributes a review talks about. Keyword membership over the
/// lowercased text; a non-neutral review matching nothing specific counts
/// as overall satisfaction.
fn match_attributes(review: &AnalyzedReview) -> Vec<&'static str> {
    let text = review.review.text.to_lowercase();
    let mut matched: Vec<&'static str> = ATTRIBUTES
        .iter()
        .filter(|(name, keywords)| {
            *name != "overall_satisfaction" && keywords.iter().any(|k| text.contains(k))
        })
        .map(|(name, _)| *name)
        .collect();

    if matched.is_empty() && review.sentiment.sentiment != Sentiment::Neutral {
        matched.push("overall_satisfaction");
    }
    matched
}

/// Deterministic per-attribute tallies with a computed winner/reasoning.
pub fn attribute_breakdown(
    product_1: &str,
    product_2: &str,
    left: &[AnalyzedReview],
    right: &[AnalyzedReview],
) -> BTreeMap<String, AttributeComparison> {
    let mut tallies: BTreeMap<&'static str, (TallySide, TallySide)> =
        ATTRIBUTES.iter().map(|(name, _)| (*name, Default::default())).collect();

    for (reviews, side) in [(left, 0usize), (right, 1usize)] {
        for review in reviews {
            for attr in match_attributes(review) {
                let entry = tallies.get_mut(attr).map(|(a, b)| if side == 0 { a } else { b });
                if let Some(tally) = entry {
                    match review.sentiment.sentiment {
                        Sentiment::Positive => tally.positive += 1,
                        Sentiment::Negative => tally.negative += 1,
                        Sentiment::Neutral => {}
                    }
                }
            }
        }
    }

    tallies
        .into_iter()
        .map(|(attr, (t1, t2))| {
            let side_1 = t1.into_side();
            let side_2 = t2.into_side();
            let (winner, reasoning) = decide_winner(attr, product_1, product_2, &side_1, &side_2);
            (
                attr.to_string(),
                AttributeComparison { product_1: side_1, product_2: side_2, winner, reasoning },
            )
        })
        .collect()
}

#[derive(Default, Clone, Copy)]
struct TallySide {
    positive: usize,
    negative: usize,
}

impl TallySide {
    fn into_side(self) -> AttributeSide {
        let total = self.positive + self.negative;
        let (positive_percentage, negative_percentage) = if total > 0 {
            let pos = round1(self.positive as f64 / total as f64 * 100.0);
            // Complement is derived, not independently rounded, so the two
            // always sum to exactly 100.
            (pos, round1(100.0 - pos))
        } else {
            (0.0, 0.0)
        };
        AttributeSide {
            positive_count: self.positive,
            negative_count: self.negative,
            positive_percentage,
            negative_percentage,
        }
    }
}

fn decide_winner(
    attr: &str,
    product_1: &str,
    product_2: &str,
    side_1: &AttributeSide,
    side_2: &AttributeSide,
) -> (String, String) {
    let mentions_1 = side_1.positive_count + side_1.negative_count;
    let mentions_2 = side_2.positive_count + side_2.negative_count;
    let pretty_attr = attr.replace('_', " ");

    if mentions_1 == 0 && mentions_2 == 0 {
        return (
            "Tie".to_string(),
            format!("Neither product has enough {} mentions to call.", pretty_attr),
        );
    }

    let winner = if side_1.positive_percentage > side_2.positive_percentage
        || (side_1.positive_percentage == side_2.positive_percentage && mentions_1 > mentions_2)
    {
        product_1
    } else if side_2.positive_percentage > side_1.positive_percentage
        || (side_1.positive_percentage == side_2.positive_percentage && mentions_2 > mentions_1)
    {
        product_2
    } else {
        return (
            "Tie".to_string(),
            format!(
                "Both products sit at {}% positive on {} mentions.",
                side_1.positive_percentage, pretty_attr
            ),
        );
    };

    let (win_side, win_mentions, lose_side, lose_mentions, loser) = if winner == product_1 {
        (side_1, mentions_1, side_2, mentions_2, product_2)
    } else {
        (side_2, mentions_2, side_1, mentions_1, product_1)
    };
    let reasoning = format!(
        "{} leads on {}: {}% positive across {} mentions, vs {}% across {} for {}.",
        winner,
        pretty_attr,
        win_side.positive_percentage,
        win_mentions,
        lose_side.positive_percentage,
        lose_mentions,
        loser,
    );
    (winner.to_string(), reasoning)
}

/// Which side (if any) is the home brand. Framing only; never touches the
/// numeric comparison.
pub fn home_side(product_1: &str, product_2: &str, home_brand: &str) -> Option<u8> {
    let brand = home_brand.to_lowercase();
    let key = brand.split_whitespace().next().unwrap_or(&brand).to_string();
    if product_1.to_lowercase().contains(&key) {
        Some(1)
    } else if product_2.to_lowercase().contains(&key) {
        Some(2)
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct NarrativeAttr {
    winner: Option<String>,
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NarrativePayload {
    #[serde(default)]
    head_to_head_comparison: BTreeMap<String, NarrativeAttr>,
    #[serde(default)]
    product_1_strengths: Vec<String>,
    #[serde(default)]
    product_1_weaknesses: Vec<String>,
    #[serde(default)]
    product_2_strengths: Vec<String>,
    #[serde(default)]
    product_2_weaknesses: Vec<String>,
    market_positioning: Option<String>,
    customer_preference_insights: Option<String>,
    executive_summary: Option<String>,
}

/// Ask the LLM for winner/reasoning narrative and free-text insights, fed
/// with the locally computed counts. Only narrative strings are adopted;
/// the numbers in `insights` are left untouched.
async fn apply_narrative(
    client: &OpenAiClient,
    analysis_1: &ProductAnalysis,
    analysis_2: &ProductAnalysis,
    insights: &mut ComparisonInsights,
    home_brand: &str,
) -> anyhow::Result<()> {
    let framing = match home_side(&analysis_1.product_name, &analysis_2.product_name, home_brand) {
        Some(1) => format!("product_1 is the home brand ({}); frame takeaways for its leadership.", home_brand),
        Some(2) => format!("product_2 is the home brand ({}); frame takeaways for its leadership.", home_brand),
        _ => "Neither product is the home brand; stay neutral.".to_string(),
    };

    let prompt = format!(
        "Compare these two products from customer review data.\n\n\
         Computed statistics (authoritative - echo these numbers, do not invent your own):\n{}\n\n\
         Per-attribute tallies:\n{}\n\n\
         {}\n\n\
         Respond with ONLY a JSON object:\n\
         {{\n\
           \"head_to_head_comparison\": {{\"<attribute>\": {{\"winner\": \"product name\", \"reasoning\": \"one sentence grounded in the tallies\"}}}},\n\
           \"product_1_strengths\": [\"...\"], \"product_1_weaknesses\": [\"...\"],\n\
           \"product_2_strengths\": [\"...\"], \"product_2_weaknesses\": [\"...\"],\n\
           \"market_positioning\": \"...\", \"customer_preference_insights\": \"...\",\n\
           \"executive_summary\": \"...\"\n\
         }}",
        serde_json::to_string_pretty(&json!({
            "product_1": analysis_1,
            "product_2": analysis_2,
        }))?,
        serde_json::to_string_pretty(&insights.head_to_head_comparison)?,
        framing,
    );

    let value = client.comparison_narrative(&prompt).await?;
    let payload: NarrativePayload = serde_json::from_value(value)?;

    for (attr, narrative) in payload.head_to_head_comparison {
        if let Some(entry) = insights.head_to_head_comparison.get_mut(&attr) {
            if let Some(winner) = narrative.winner {
                entry.winner = winner;
            }
            if let Some(reasoning) = narrative.reasoning {
                entry.reasoning = reasoning;
            }
        }
    }
    insights.product_1_strengths = payload.product_1_strengths;
    insights.product_1_weaknesses = payload.product_1_weaknesses;
    insights.product_2_strengths = payload.product_2_strengths;
    insights.product_2_weaknesses = payload.product_2_weaknesses;
    insights.market_positioning = payload.market_positioning;
    insights.customer_preference_insights = payload.customer_preference_insights;
    insights.executive_summary = payload.executive_summary;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMethod, RawReview, SentimentVerdict};

    fn review(text: &str, sentiment: Sentiment, source: Source, rating: f32) -> AnalyzedReview {
        AnalyzedReview {
            review: RawReview::new("tester", text, rating, "2024-01-01"),
            sentiment: SentimentVerdict {
                sentiment,
                polarity: match sentiment {
                    Sentiment::Positive => 0.5,
                    Sentiment::Negative => -0.5,
                    Sentiment::Neutral => 0.0,
                },
                subjectivity: 0.5,
                confidence: None,
                method: AnalysisMethod::KeywordTextblob,
            },
            source,
        }
    }

    #[test]
    fn splits_on_vs() {
        let (a, b) = split_comparison_query("Dr Martens 1460 vs Timberland 6 inch").unwrap();
        assert_eq!(a, "dr martens 1460");
        assert_eq!(b, "timberland 6 inch");
    }

    #[test]
    fn splits_on_every_separator() {
        for sep in SEPARATORS {
            let query = format!("first boot{}second boot", sep);
            let (a, b) = split_comparison_query(&query).unwrap();
            assert_eq!(a, "first boot", "separator {:?}", sep);
            assert_eq!(b, "second boot", "separator {:?}", sep);
        }
    }

    #[test]
    fn earliest_separator_wins() {
        let (a, b) = split_comparison_query("solovair or martens vs timberland").unwrap();
        assert_eq!(a, "solovair");
        assert_eq!(b, "martens vs timberland");
    }

    #[test]
    fn plain_query_is_not_a_comparison() {
        assert!(split_comparison_query("Dr Martens 1460").is_none());
        assert!(split_comparison_query(" vs boots").is_none());
    }

    #[tokio::test]
    async fn compare_rejects_non_comparison_before_fetching() {
        let http = reqwest::Client::new();
        let analyzer = SentimentAnalyzer::new(None);
        let result = compare(
            &http,
            &SourceConfig::default(),
            &analyzer,
            None,
            "Dr Martens",
            "Dr Martens 1460",
            10,
        )
        .await;
        assert!(matches!(result, Err(CompareError::NotComparisonQuery)));
    }

    #[test]
    fn product_analysis_percentages() {
        let reviews = vec![
            review("love them", Sentiment::Positive, Source::Marketplace, 5.0),
            review("love them", Sentiment::Positive, Source::Forum, 0.0),
            review("hate them", Sentiment::Negative, Source::Video, 0.0),
            review("they exist", Sentiment::Neutral, Source::Forum, 3.0),
        ];
        let analysis = analyze_product("dr martens 1460", &reviews);
        assert_eq!(analysis.total_reviews, 4);
        assert_eq!(analysis.sentiment_percentages.positive, 50.0);
        assert_eq!(analysis.sentiment_percentages.negative, 25.0);
        assert_eq!(analysis.average_rating, 4.0);
        assert_eq!(analysis.per_source_counts[&Source::Forum], 2);
    }

    #[test]
    fn empty_product_analysis_is_all_zeros() {
        let analysis = analyze_product("ghost boot", &[]);
        assert_eq!(analysis.total_reviews, 0);
        assert_eq!(analysis.sentiment_percentages.positive, 0.0);
        assert_eq!(analysis.average_rating, 0.0);
    }

    #[test]
    fn reviews_can_match_multiple_attributes() {
        let r = review(
            "Great quality leather and very comfortable.",
            Sentiment::Positive,
            Source::Marketplace,
            0.0,
        );
        let attrs = match_attributes(&r);
        assert!(attrs.contains(&"quality"));
        assert!(attrs.contains(&"comfort"));
        assert!(!attrs.contains(&"overall_satisfaction"));
    }

    #[test]
    fn unmatched_sentiment_lands_in_overall_satisfaction() {
        let r = review("Absolutely brilliant.", Sentiment::Positive, Source::Forum, 0.0);
        assert_eq!(match_attributes(&r), vec!["overall_satisfaction"]);

        let neutral = review("Delivered on Tuesday.", Sentiment::Neutral, Source::Forum, 0.0);
        assert!(match_attributes(&neutral).is_empty());
    }

    #[test]
    fn attribute_percentages_sum_to_100_or_are_zero() {
        let left = vec![
            review("quality is great", Sentiment::Positive, Source::Marketplace, 0.0),
            review("quality is great", Sentiment::Positive, Source::Forum, 0.0),
            review("quality is poor", Sentiment::Negative, Source::Video, 0.0),
        ];
        let right = vec![review("quality is poor", Sentiment::Negative, Source::Forum, 0.0)];
        let breakdown = attribute_breakdown("a", "b", &left, &right);

        for (attr, comparison) in &breakdown {
            for side in [&comparison.product_1, &comparison.product_2] {
                let mentions = side.positive_count + side.negative_count;
                if mentions > 0 {
                    assert_eq!(
                        side.positive_percentage + side.negative_percentage,
                        100.0,
                        "attribute {}",
                        attr
                    );
                } else {
                    assert_eq!(side.positive_percentage, 0.0, "attribute {}", attr);
                    assert_eq!(side.negative_percentage, 0.0, "attribute {}", attr);
                }
            }
        }

        let quality = &breakdown["quality"];
        assert_eq!(quality.product_1.positive_count, 2);
        assert_eq!(quality.product_1.negative_count, 1);
        assert_eq!(quality.product_2.negative_count, 1);
        assert_eq!(quality.winner, "a");
    }

    #[test]
    fn winner_is_tie_when_nobody_mentions_it() {
        let breakdown = attribute_breakdown("a", "b", &[], &[]);
        assert_eq!(breakdown["durability"].winner, "Tie");
    }

    #[test]
    fn home_brand_detection() {
        assert_eq!(home_side("dr martens 1460", "timberland", "Dr Martens"), Some(1));
        assert_eq!(home_side("timberland", "dr martens 1460", "Dr Martens"), Some(2));
        assert_eq!(home_side("solovair", "timberland", "Dr Martens"), None);
    }

    #[tokio::test]
    async fn both_sides_empty_still_produces_a_numeric_result() {
        let result = build_comparison("a", "b", &[], &[], None, "Dr Martens", "a vs b").await;
        assert_eq!(result.comparison_summary.total_reviews_compared, 0);
        assert_eq!(result.product_1.total_reviews, 0);
        assert_eq!(result.ai_insights.head_to_head_comparison.len(), ATTRIBUTES.len());
        assert!(result.ai_insights.executive_summary.is_none());
    }
}
