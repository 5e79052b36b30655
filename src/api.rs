//! HTTP handlers and wire types.
//!
//! Handlers marshal between JSON bodies and the pipeline modules and map
//! domain errors to status codes: 400 for malformed requests, 404 when no
//! data exists, 500 when the LLM collaborator is required but unconfigured.
//! Per-source failures inside aggregate/compare never change the status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::aggregate::{self, AggregateError};
use crate::compare::{self, CompareError, ComparisonInsights, ComparisonSummary, ProductAnalysis};
use crate::demo;
use crate::models::{AggregateStatistics, AnalyzedReview, RawReview, SentimentVerdict, Source};
use crate::openai::{ChatHistoryEntry, OpenAiClient};
use crate::sentiment::SentimentAnalyzer;
use crate::sources::{self, SourceConfig};

/// Shared process state; everything in here is cheap to clone or borrow.
pub struct AppState {
    pub http: reqwest::Client,
    pub config: SourceConfig,
    pub analyzer: SentimentAnalyzer,
    pub openai: Option<OpenAiClient>,
    pub home_brand: String,
}

fn default_max_reviews() -> usize {
    10
}

fn default_location() -> String {
    "Global".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,
    #[serde(default)]
    pub use_demo: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    pub reviews: Vec<AnalyzedReview>,
    pub total: usize,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AggregateRequest {
    pub query: String,
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SourceBucket {
    pub reviews: Vec<AnalyzedReview>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AggregateResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub per_source: BTreeMap<Source, SourceBucket>,
    pub combined_statistics: AggregateStatistics,
    pub all_reviews: Vec<AnalyzedReview>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompareRequest {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompareResponse {
    pub success: bool,
    pub product_1: ProductAnalysis,
    pub product_2: ProductAnalysis,
    pub ai_insights: ComparisonInsights,
    pub comparison_summary: ComparisonSummary,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub text: String,
    pub analysis: SentimentVerdict,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InsightsRequest {
    pub reviews: Vec<AnalyzedReview>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InsightsResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub insights: Value,
    pub generated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub reviews: Vec<AnalyzedReview>,
    #[serde(default)]
    pub chat_history: Vec<ChatHistoryEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRequest {
    #[schema(value_type = Object)]
    pub insights: Value,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub success: bool,
    pub report: String,
    pub generated_at: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Classify a freshly fetched batch and tag it with its source.
async fn analyze_batch(
    analyzer: &SentimentAnalyzer,
    raw: Vec<RawReview>,
    source: Source,
) -> Vec<AnalyzedReview> {
    let mut analyzed = Vec::with_capacity(raw.len());
    for review in raw {
        let rating = (review.rating > 0.0).then_some(review.rating);
        let sentiment = analyzer.classify(&review.text, rating).await;
        analyzed.push(AnalyzedReview { review, sentiment, source });
    }
    analyzed
}

#[utoipa::path(
    post,
    path = "/sources/{source}/search",
    params(("source" = String, Path, description = "marketplace | forum | video | review_site")),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Reviews from one source; a failed fetch still returns 200 with an error field", body = SearchResponse),
        (status = 400, description = "Empty query"),
        (status = 404, description = "Unknown source"),
    ),
    tag = "reviews"
)]
pub async fn search_source(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, StatusCode> {
    let source = Source::from_str(&source).map_err(|_| StatusCode::NOT_FOUND)?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    println!("🔍 /{}/search: '{}' (max {})", source, query, req.max_reviews);

    let mut error = None;
    let raw = if source == Source::Marketplace && req.use_demo {
        demo::generate_reviews(query, req.max_reviews)
    } else {
        match sources::fetch_source(&state.http, &state.config, source, query, req.max_reviews)
            .await
        {
            Ok(items) if items.is_empty() && source == Source::Marketplace => {
                // Marketplace scraping is frequently blocked; fall back to
                // synthetic data so the endpoint stays useful.
                error = Some("live marketplace fetch returned nothing, using demo data".to_string());
                demo::generate_reviews(query, req.max_reviews)
            }
            Ok(items) => items,
            Err(e) if source == Source::Marketplace => {
                error = Some(format!("live marketplace fetch failed ({}), using demo data", e));
                demo::generate_reviews(query, req.max_reviews)
            }
            Err(e) => {
                eprintln!("⚠️ {} search failed: {}", source, e);
                return Ok(Json(SearchResponse {
                    success: false,
                    reviews: Vec::new(),
                    total: 0,
                    source,
                    error: Some(e.to_string()),
                }));
            }
        }
    };

    let reviews = analyze_batch(&state.analyzer, raw, source).await;
    Ok(Json(SearchResponse {
        success: true,
        total: reviews.len(),
        reviews,
        source,
        error,
    }))
}

#[utoipa::path(
    post,
    path = "/aggregate",
    request_body = AggregateRequest,
    responses(
        (status = 200, description = "Combined reviews and statistics", body = AggregateResponse),
        (status = 400, description = "Empty query"),
        (status = 404, description = "No reviews found from any source"),
    ),
    tag = "reviews"
)]
pub async fn aggregate_reviews(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, StatusCode> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    println!("📊 /aggregate: '{}' (max {} per source)", query, req.max_reviews);

    let outcome =
        aggregate::aggregate(&state.http, &state.config, &state.analyzer, query, req.max_reviews)
            .await
            .map_err(|e| match e {
                AggregateError::NoDataFound => StatusCode::NOT_FOUND,
            })?;

    let all_reviews = outcome.all_reviews();
    let per_source = outcome
        .per_source
        .into_iter()
        .map(|(source, reviews)| {
            let count = reviews.len();
            (source, SourceBucket { reviews, count })
        })
        .collect();

    Ok(Json(AggregateResponse {
        success: true,
        per_source,
        combined_statistics: outcome.stats,
        all_reviews,
    }))
}

#[utoipa::path(
    post,
    path = "/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Head-to-head comparison of two products", body = CompareResponse),
        (status = 400, description = "Query has no comparison separator"),
    ),
    tag = "reviews"
)]
pub async fn compare_products(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, StatusCode> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let result = compare::compare(
        &state.http,
        &state.config,
        &state.analyzer,
        state.openai.as_ref(),
        &state.home_brand,
        query,
        default_max_reviews(),
    )
    .await
    .map_err(|e| match e {
        CompareError::NotComparisonQuery => StatusCode::BAD_REQUEST,
    })?;

    Ok(Json(CompareResponse {
        success: true,
        product_1: result.product_1,
        product_2: result.product_2,
        ai_insights: result.ai_insights,
        comparison_summary: result.comparison_summary,
    }))
}

#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses((status = 200, description = "Sentiment verdict for one text", body = AnalyzeResponse)),
    tag = "sentiment"
)]
pub async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse> {
    let analysis = state.analyzer.classify(&req.text, None).await;
    Json(AnalyzeResponse { success: true, text: req.text, analysis })
}

#[utoipa::path(
    post,
    path = "/insights",
    request_body = InsightsRequest,
    responses(
        (status = 200, description = "AI business-intelligence report", body = InsightsResponse),
        (status = 400, description = "No reviews supplied"),
        (status = 500, description = "OpenAI key not configured or call failed"),
    ),
    tag = "ai"
)]
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsightsRequest>,
) -> Result<Json<InsightsResponse>, StatusCode> {
    if req.reviews.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let client = state.openai.as_ref().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    println!("🤖 /insights over {} reviews", req.reviews.len());

    let insights = client.generate_insights(&req.reviews).await.map_err(|e| {
        eprintln!("❌ Insights generation failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(InsightsResponse {
        success: true,
        insights,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }))
}

#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Review-grounded answer", body = ChatResponse),
        (status = 400, description = "Empty question"),
        (status = 500, description = "OpenAI key not configured or call failed"),
    ),
    tag = "ai"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let client = state.openai.as_ref().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let response = client
        .chat_about_reviews(question, &req.reviews, &req.chat_history)
        .await
        .map_err(|e| {
            eprintln!("❌ Chat failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ChatResponse { success: true, response }))
}

#[utoipa::path(
    post,
    path = "/report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Markdown executive report", body = ReportResponse),
        (status = 400, description = "Missing insights payload"),
        (status = 500, description = "OpenAI key not configured or call failed"),
    ),
    tag = "ai"
)]
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, StatusCode> {
    if req.insights.is_null() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let client = state.openai.as_ref().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let report = client.generate_report(&req.insights, &req.location).await.map_err(|e| {
        eprintln!("❌ Report generation failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ReportResponse {
        success: true,
        report,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            http: reqwest::Client::new(),
            config: SourceConfig::default(),
            analyzer: SentimentAnalyzer::new(None),
            openai: None,
            home_brand: "Dr Martens".to_string(),
        })
    }

    #[test]
    fn search_request_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "boots"}"#).unwrap();
        assert_eq!(req.max_reviews, 10);
        assert!(!req.use_demo);
    }

    #[test]
    fn report_request_default_location() {
        let req: ReportRequest = serde_json::from_str(r#"{"insights": {"a": 1}}"#).unwrap();
        assert_eq!(req.location, "Global");
    }

    #[tokio::test]
    async fn analyze_endpoint_classifies_inline() {
        let Json(resp) = analyze_text(
            State(test_state()),
            Json(AnalyzeRequest { text: "These boots are amazing, I love them".to_string() }),
        )
        .await;
        assert!(resp.success);
        assert_eq!(resp.analysis.sentiment, crate::models::Sentiment::Positive);
    }

    #[tokio::test]
    async fn search_rejects_unknown_source() {
        let result = search_source(
            State(test_state()),
            Path("blogs".to_string()),
            Json(SearchRequest { query: "boots".to_string(), max_reviews: 5, use_demo: false }),
        )
        .await;
        assert!(matches!(result, Err(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn search_rejects_empty_query() {
        let result = search_source(
            State(test_state()),
            Path("forum".to_string()),
            Json(SearchRequest { query: "   ".to_string(), max_reviews: 5, use_demo: false }),
        )
        .await;
        assert!(matches!(result, Err(StatusCode::BAD_REQUEST)));
    }

    #[tokio::test]
    async fn demo_search_returns_analyzed_reviews() {
        let result = search_source(
            State(test_state()),
            Path("marketplace".to_string()),
            Json(SearchRequest { query: "dr martens 1460".to_string(), max_reviews: 6, use_demo: true }),
        )
        .await
        .unwrap();
        assert!(result.0.success);
        assert_eq!(result.0.total, 6);
        assert!(result.0.reviews.iter().all(|r| r.source == Source::Marketplace));
    }

    #[tokio::test]
    async fn insights_requires_openai_key() {
        let result = generate_insights(
            State(test_state()),
            Json(InsightsRequest {
                reviews: vec![],
            }),
        )
        .await;
        assert!(matches!(result, Err(StatusCode::BAD_REQUEST)));

        let reviews: Vec<AnalyzedReview> = serde_json::from_value(serde_json::json!([{
            "author": "a", "text": "great boots", "rating": 5.0, "date": "2024-01-01",
            "sentiment": {"sentiment": "positive", "polarity": 0.3, "subjectivity": 0.5,
                          "confidence": null, "method": "keyword_textblob"},
            "source": "marketplace"
        }]))
        .unwrap();
        let result =
            generate_insights(State(test_state()), Json(InsightsRequest { reviews })).await;
        assert!(matches!(result, Err(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[tokio::test]
    async fn chat_requires_question() {
        let result = chat(
            State(test_state()),
            Json(ChatRequest {
                question: "".to_string(),
                reviews: vec![],
                chat_history: vec![],
            }),
        )
        .await;
        assert!(matches!(result, Err(StatusCode::BAD_REQUEST)));
    }
}
