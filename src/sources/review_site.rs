//! Review-site adapter: Trustpilot company pages.
//!
//! Trustpilot organizes reviews by company domain rather than free-text
//! search, so the query is resolved through a small brand→domain table with
//! a `www.<first-token>.com` fallback guess.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{clip_text, SourceError};
use crate::models::RawReview;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

static BRAND_DOMAINS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("dr martens", "www.drmartens.com"),
        ("dr. martens", "www.drmartens.com"),
        ("doc martens", "www.drmartens.com"),
        ("timberland", "www.timberland.com"),
        ("solovair", "nps-solovair.com"),
        ("blundstone", "www.blundstone.com"),
        ("red wing", "www.redwingshoes.com"),
        ("grenson", "www.grenson.com"),
    ]
});

static REVIEW_CARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article[data-service-review-card-paper]").expect("selector"));
static REVIEW_CARD_ALT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-service-review-card]").expect("selector"));
static REVIEW_TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p[data-service-review-text-typography]").expect("selector"));
static REVIEW_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2[data-service-review-title-typography]").expect("selector"));
static RATING_IMG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-service-review-rating] img").expect("selector"));
static CONSUMER_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[data-consumer-name-typography]").expect("selector"));
static REVIEW_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("selector"));
static VERIFIED_BADGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-service-review-verification-badge]").expect("selector"));

static RATED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Rated\s+(\d+)").expect("regex"));

const MIN_TEXT_LEN: usize = 10;

pub async fn fetch(
    http: &reqwest::Client,
    query: &str,
    limit: usize,
) -> Result<Vec<RawReview>, SourceError> {
    let domain = resolve_domain(query);
    let url = format!("https://www.trustpilot.com/review/{}", domain);
    println!("⭐ Fetching Trustpilot reviews from: {}", url);

    let html = http
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .text()
        .await?;

    let reviews = {
        let doc = Html::parse_document(&html);
        extract_reviews(&doc, limit)
    };

    if reviews.is_empty() {
        return Err(SourceError::Parse(format!("no review cards on {}", url)));
    }

    println!("✅ Scraped {} Trustpilot reviews", reviews.len());
    Ok(reviews)
}

/// Map a product query to the Trustpilot company domain.
fn resolve_domain(query: &str) -> String {
    let lowered = query.to_lowercase();
    for (brand, domain) in BRAND_DOMAINS.iter() {
        if lowered.contains(brand) {
            return domain.to_string();
        }
    }
    let token: String = lowered
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    format!("www.{}.com", token)
}

fn extract_reviews(doc: &Html, limit: usize) -> Vec<RawReview> {
    let mut reviews = Vec::new();

    let cards: Vec<_> = doc.select(&REVIEW_CARD).collect();
    let cards = if cards.is_empty() {
        doc.select(&REVIEW_CARD_ALT).collect()
    } else {
        cards
    };

    for card in cards {
        if reviews.len() >= limit {
            break;
        }

        let text = card
            .select(&REVIEW_TEXT)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        if text.len() <= MIN_TEXT_LEN {
            continue;
        }

        let rating = card
            .select(&RATING_IMG)
            .next()
            .and_then(|img| img.value().attr("alt"))
            .and_then(parse_rating)
            .unwrap_or(0.0);

        let author = card
            .select(&CONSUMER_NAME)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());

        let date = card
            .select(&REVIEW_DATE)
            .next()
            .and_then(|t| t.value().attr("datetime").map(String::from))
            .or_else(|| {
                card.select(&REVIEW_DATE)
                    .next()
                    .map(|t| t.text().collect::<String>().trim().to_string())
            })
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut review = RawReview::new(author, clip_text(&text), rating, date);
        review.title = card
            .select(&REVIEW_TITLE)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());
        review.verified = Some(card.select(&VERIFIED_BADGE).next().is_some());
        reviews.push(review);
    }

    reviews
}

/// Pull the star count out of alt text like "Rated 4 out of 5 stars".
fn parse_rating(alt: &str) -> Option<f32> {
    RATED_RE
        .captures(alt)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|r| (1.0..=5.0).contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_brands_resolve_to_domains() {
        assert_eq!(resolve_domain("Dr Martens 1460"), "www.drmartens.com");
        assert_eq!(resolve_domain("timberland 6 inch premium"), "www.timberland.com");
    }

    #[test]
    fn unknown_brand_falls_back_to_guess() {
        assert_eq!(resolve_domain("Acme rocket skates"), "www.acme.com");
    }

    #[test]
    fn rating_parses_alt_text() {
        assert_eq!(parse_rating("Rated 4 out of 5 stars"), Some(4.0));
        assert_eq!(parse_rating("stars"), None);
    }

    #[test]
    fn extracts_cards() {
        let html = r#"
            <article data-service-review-card-paper="true">
                <span data-consumer-name-typography="true">Sam</span>
                <div data-service-review-rating="5"><img alt="Rated 5 out of 5 stars"/></div>
                <h2 data-service-review-title-typography="true">Brilliant service</h2>
                <p data-service-review-text-typography="true">Ordering was easy and the boots arrived in two days. Very happy.</p>
                <time datetime="2024-04-02T08:00:00Z">April 2</time>
                <div data-service-review-verification-badge="true"></div>
            </article>
        "#;
        let doc = Html::parse_document(html);
        let reviews = extract_reviews(&doc, 10);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 5.0);
        assert_eq!(reviews[0].date, "2024-04-02T08:00:00Z");
        assert_eq!(reviews[0].verified, Some(true));
    }
}
