mod aggregate;
mod api;
mod compare;
mod demo;
mod lexicon;
mod models;
mod openai;
mod sentiment;
mod sources;

use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::AppState;
use crate::openai::OpenAiClient;
use crate::sentiment::SentimentAnalyzer;
use crate::sources::SourceConfig;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health,
        api::search_source,
        api::aggregate_reviews,
        api::compare_products,
        api::analyze_text,
        api::generate_insights,
        api::chat,
        api::generate_report
    ),
    components(
        schemas(
            api::HealthResponse,
            api::SearchRequest,
            api::SearchResponse,
            api::AggregateRequest,
            api::AggregateResponse,
            api::SourceBucket,
            api::CompareRequest,
            api::CompareResponse,
            api::AnalyzeRequest,
            api::AnalyzeResponse,
            api::InsightsRequest,
            api::InsightsResponse,
            api::ChatRequest,
            api::ChatResponse,
            api::ReportRequest,
            api::ReportResponse,
            crate::models::Source,
            crate::models::Sentiment,
            crate::models::AnalysisMethod,
            crate::models::RawReview,
            crate::models::SentimentVerdict,
            crate::models::AnalyzedReview,
            crate::models::AggregateStatistics,
            crate::compare::ProductAnalysis,
            crate::compare::TriCount,
            crate::compare::TriPercentage,
            crate::compare::AttributeSide,
            crate::compare::AttributeComparison,
            crate::compare::ComparisonInsights,
            crate::compare::ComparisonSummary,
            crate::openai::ChatHistoryEntry
        )
    ),
    tags(
        (name = "reviews", description = "Review aggregation and comparison"),
        (name = "sentiment", description = "Sentiment classification"),
        (name = "ai", description = "LLM-backed insights, chat and reports"),
        (name = "system", description = "Health and diagnostics")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let openai = OpenAiClient::from_env();
    if openai.is_some() {
        println!("🤖 OpenAI configured: AI sentiment tier and narrative endpoints active");
    } else {
        println!("⚠️ OPENAI_API_KEY not set: keyword sentiment only, AI endpoints return 500");
    }

    let config = SourceConfig::from_env();
    if config.youtube_api_key.is_none() {
        println!("⚠️ YOUTUBE_API_KEY not set: video source will come back empty");
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    let state = Arc::new(AppState {
        http,
        config,
        // The classifier gets its own client handle so the narrative
        // endpoints and the AI tier can be toggled by the same key.
        analyzer: SentimentAnalyzer::new(OpenAiClient::from_env()),
        openai,
        home_brand: env::var("HOME_BRAND").unwrap_or_else(|_| "Dr Martens".to_string()),
    });

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::health))
        .route("/sources/:source/search", post(api::search_source))
        .route("/aggregate", post(api::aggregate_reviews))
        .route("/compare", post(api::compare_products))
        .route("/analyze", post(api::analyze_text))
        .route("/insights", post(api::generate_insights))
        .route("/chat", post(api::chat))
        .route("/report", post(api::generate_report))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(5000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("🚀 Review radar listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
