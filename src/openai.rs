//! OpenAI chat-completions client.
//!
//! One client instance is built at startup (when `OPENAI_API_KEY` is set) and
//! injected wherever a text collaborator is needed: per-review sentiment
//! classification, business-insight generation, review Q&A chat, report
//! writing and the competitive-comparison narrative. Every call is bounded
//! by the underlying reqwest timeout; callers treat failures as "collaborator
//! degraded", never as pipeline errors.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::AnalyzedReview;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Fast/cheap model for per-review sentiment calls.
const SENTIMENT_MODEL: &str = "gpt-4o-mini";
/// Full model for insight/report generation.
const INSIGHT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Sentiment classification as returned by the model (JSON mode).
#[derive(Debug, Deserialize)]
pub struct AiSentiment {
    pub sentiment: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    #[allow(dead_code)]
    pub reasoning: String,
}

fn default_confidence() -> f64 {
    0.5
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        OpenAiClient { http, api_key }
    }

    /// Build from `OPENAI_API_KEY`; `None` disables the AI tier entirely.
    pub fn from_env() -> Option<Self> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(OpenAiClient::new(key)),
            _ => None,
        }
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        let mut payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI request failed ({}): {}", status, body));
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI response contained no choices"))
    }

    /// Tier-1 sentiment classification with a short timeout; a slow model
    /// call degrades to the keyword fallback instead of stalling the batch.
    pub async fn classify_sentiment(&self, text: &str) -> Result<AiSentiment> {
        let messages = [
            ChatMessage::system(
                "You are a sentiment analyzer. Analyze the overall sentiment of product reviews \
                 considering context, sarcasm, and mixed emotions. Respond with ONLY a JSON object: \
                 {\"sentiment\": \"positive\"|\"negative\"|\"neutral\", \"confidence\": 0.0-1.0, \
                 \"reasoning\": \"brief explanation\"}",
            ),
            ChatMessage::user(format!("Analyze this review sentiment:\n\n{}", text)),
        ];

        let content = tokio::time::timeout(
            Duration::from_secs(8),
            self.chat(SENTIMENT_MODEL, &messages, 0.3, 100, true),
        )
        .await
        .map_err(|_| anyhow!("sentiment classification timed out"))??;

        serde_json::from_str(&content).map_err(|e| anyhow!("malformed sentiment JSON: {}", e))
    }

    /// Comprehensive business-intelligence report over a review batch.
    pub async fn generate_insights(&self, reviews: &[AnalyzedReview]) -> Result<Value> {
        let reviews_text = render_reviews(reviews, 30);

        let prompt = format!(
            "Analyze these customer reviews and provide a comprehensive business intelligence report:\n\n\
             {reviews_text}\n\n\
             Provide a detailed analysis in the following JSON format:\n\
             {{\n\
               \"executive_summary\": \"2-3 sentence high-level overview of customer sentiment and key findings\",\n\
               \"key_themes\": [{{\"theme\": \"...\", \"sentiment\": \"positive/negative/mixed\", \"frequency\": \"high/medium/low\", \"description\": \"...\"}}],\n\
               \"strengths\": [{{\"strength\": \"...\", \"impact\": \"high/medium/low\", \"examples\": \"...\"}}],\n\
               \"pain_points\": [{{\"issue\": \"...\", \"severity\": \"high/medium/low\", \"recommendation\": \"...\"}}],\n\
               \"recommendations\": [{{\"priority\": \"high/medium/low\", \"action\": \"...\", \"expected_impact\": \"...\"}}],\n\
               \"customer_personas\": [{{\"type\": \"...\", \"characteristics\": \"...\", \"needs\": \"...\"}}],\n\
               \"sentiment_drivers\": {{\"positive_drivers\": [\"...\"], \"negative_drivers\": [\"...\"]}},\n\
               \"competitive_insights\": {{\"unique_strengths\": \"...\", \"areas_for_improvement\": \"...\", \"market_positioning\": \"...\"}},\n\
               \"trend_analysis\": {{\"emerging_patterns\": \"...\", \"seasonal_factors\": \"...\", \"prediction\": \"...\"}}\n\
             }}\n\n\
             Be specific, data-driven, and actionable. Use customer language where relevant. \
             Return ONLY the JSON object, no additional text."
        );

        let messages = [
            ChatMessage::system(
                "You are a business intelligence analyst specializing in customer sentiment \
                 analysis. Always respond with valid JSON only.",
            ),
            ChatMessage::user(prompt),
        ];

        let content = self.chat(INSIGHT_MODEL, &messages, 0.7, 4000, true).await?;
        serde_json::from_str(&content).map_err(|e| anyhow!("malformed insights JSON: {}", e))
    }

    /// Review-grounded Q&A; the last 6 history turns are replayed.
    pub async fn chat_about_reviews(
        &self,
        question: &str,
        reviews: &[AnalyzedReview],
        history: &[ChatHistoryEntry],
    ) -> Result<String> {
        let reviews_text = render_reviews(reviews, 30);

        let mut messages = vec![ChatMessage::system(format!(
            "You are an AI assistant analyzing customer reviews.\n\n\
             Here are the reviews to analyze:\n\n{reviews_text}\n\n\
             Answer questions based on these reviews. Be specific, cite examples when relevant, \
             and provide actionable insights."
        ))];
        for entry in history.iter().rev().take(6).rev() {
            messages.push(ChatMessage { role: entry.role.clone(), content: entry.content.clone() });
        }
        messages.push(ChatMessage::user(question));

        self.chat(INSIGHT_MODEL, &messages, 0.7, 1500, false).await
    }

    /// Markdown executive report from an insights payload.
    pub async fn generate_report(&self, insights: &Value, location: &str) -> Result<String> {
        let prompt = format!(
            "Create a professional executive report based on these insights for {location}:\n\n\
             {}\n\n\
             Format as a clean, professional business report with:\n\
             - Executive Summary\n\
             - Key Findings (bullet points)\n\
             - Detailed Analysis (sections with headers)\n\
             - Actionable Recommendations (prioritized list)\n\
             - Conclusion\n\n\
             Use markdown formatting for structure. Make it suitable for presentation to executives.",
            serde_json::to_string_pretty(insights).unwrap_or_default()
        );

        let messages = [
            ChatMessage::system(
                "You are a professional business report writer specializing in customer \
                 experience analysis.",
            ),
            ChatMessage::user(prompt),
        ];

        self.chat(INSIGHT_MODEL, &messages, 0.7, 3000, false).await
    }

    /// Qualitative narrative for the two-product comparison. The prompt
    /// carries the locally computed counts; the caller keeps its own numbers
    /// and only adopts the narrative strings.
    pub async fn comparison_narrative(&self, prompt: &str) -> Result<Value> {
        let messages = [
            ChatMessage::system(
                "You are a competitive intelligence analyst comparing two products from customer \
                 review data. Always respond with valid JSON only.",
            ),
            ChatMessage::user(prompt.to_string()),
        ];

        let content = self.chat(INSIGHT_MODEL, &messages, 0.7, 3000, true).await?;
        serde_json::from_str(&content).map_err(|e| anyhow!("malformed comparison JSON: {}", e))
    }
}

/// One prior chat turn as sent by the frontend.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChatHistoryEntry {
    pub role: String,
    pub content: String,
}

fn render_reviews(reviews: &[AnalyzedReview], cap: usize) -> String {
    reviews
        .iter()
        .take(cap)
        .map(|r| {
            let rating = if r.review.rating > 0.0 {
                format!("{}/5", r.review.rating)
            } else {
                "N/A".to_string()
            };
            format!(
                "Rating: {}\nReview: {}\nSentiment: {}",
                rating, r.review.text, r.sentiment.sentiment
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawReview, SentimentVerdict, Source};

    fn sample_review(text: &str, rating: f32) -> AnalyzedReview {
        AnalyzedReview {
            review: RawReview::new("tester", text, rating, "2024-01-01"),
            sentiment: SentimentVerdict {
                sentiment: crate::models::Sentiment::Positive,
                polarity: 0.5,
                subjectivity: 0.5,
                confidence: None,
                method: crate::models::AnalysisMethod::KeywordTextblob,
            },
            source: Source::Marketplace,
        }
    }

    #[test]
    fn render_caps_and_formats() {
        let reviews: Vec<_> = (0..40).map(|i| sample_review(&format!("review {}", i), 0.0)).collect();
        let text = render_reviews(&reviews, 30);
        assert_eq!(text.matches("Review: review").count(), 30);
        assert!(text.contains("Rating: N/A"));
    }

    #[test]
    fn rated_review_renders_stars() {
        let text = render_reviews(&[sample_review("solid boots", 4.0)], 30);
        assert!(text.contains("Rating: 4/5"));
    }

    #[test]
    fn ai_sentiment_parses_with_defaults() {
        let parsed: AiSentiment = serde_json::from_str(r#"{"sentiment": "positive"}"#).unwrap();
        assert_eq!(parsed.sentiment, "positive");
        assert_eq!(parsed.confidence, 0.5);
    }
}
