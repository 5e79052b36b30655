//! Marketplace adapter: Amazon product reviews.
//!
//! Plain-HTTP best effort: search page → first product → review blocks on
//! the product page. Amazon aggressively blocks non-browser traffic, so a
//! blocked or empty page surfaces as a `SourceError` and the caller decides
//! whether to degrade to empty or serve demo data.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use scraper::{Html, Selector};

use super::{clip_text, SourceError};
use crate::models::RawReview;

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    ]
});

static PRODUCT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.a-link-normal.s-no-outline").expect("selector"));
static PRODUCT_LINK_ALT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2 a.a-link-normal").expect("selector"));
static REVIEW_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-hook='review']").expect("selector"));
static REVIEW_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[data-hook='review-body']").expect("selector"));
static REVIEW_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[data-hook='review-title'] span").expect("selector"));
static REVIEW_STARS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("i[data-hook='review-star-rating'] span.a-icon-alt").expect("selector"));
static REVIEW_AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.a-profile-name").expect("selector"));
static REVIEW_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[data-hook='review-date']").expect("selector"));
static VERIFIED_BADGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[data-hook='avp-badge']").expect("selector"));

static STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("regex"));

/// Review bodies at or under this length are noise ("Good.", "A+").
const MIN_TEXT_LEN: usize = 10;

pub async fn fetch(
    http: &reqwest::Client,
    query: &str,
    limit: usize,
) -> Result<Vec<RawReview>, SourceError> {
    println!("🛒 Searching Amazon for: {}", query);

    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let search_url = format!("https://www.amazon.com/s?k={}", urlencoding::encode(query));
    let search_html = http
        .get(&search_url)
        .header("User-Agent", user_agent)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .text()
        .await?;

    if looks_blocked(&search_html) {
        return Err(SourceError::Blocked("captcha interstitial on search page".into()));
    }

    // Html is parsed inside a block so it never crosses an await point.
    let product_url = {
        let doc = Html::parse_document(&search_html);
        first_product_url(&doc)
    }
    .ok_or_else(|| SourceError::Parse(format!("no products found for '{}'", query)))?;

    let page_html = http
        .get(&product_url)
        .header("User-Agent", user_agent)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .text()
        .await?;

    if looks_blocked(&page_html) {
        return Err(SourceError::Blocked("captcha interstitial on product page".into()));
    }

    let reviews = {
        let doc = Html::parse_document(&page_html);
        extract_reviews(&doc, limit)
    };

    if reviews.is_empty() {
        return Err(SourceError::Parse("product page contained no review blocks".into()));
    }

    println!("✅ Found {} Amazon reviews", reviews.len());
    Ok(reviews)
}

fn looks_blocked(html: &str) -> bool {
    html.contains("api-services-support@amazon.com")
        || html.contains("Enter the characters you see below")
}

fn first_product_url(doc: &Html) -> Option<String> {
    let href = doc
        .select(&PRODUCT_LINK)
        .next()
        .or_else(|| doc.select(&PRODUCT_LINK_ALT).next())?
        .value()
        .attr("href")?;
    if href.starts_with("http") {
        Some(href.to_string())
    } else {
        Some(format!("https://www.amazon.com{}", href))
    }
}

fn extract_reviews(doc: &Html, limit: usize) -> Vec<RawReview> {
    let mut reviews = Vec::new();

    for block in doc.select(&REVIEW_BLOCK) {
        if reviews.len() >= limit {
            break;
        }

        let text = block
            .select(&REVIEW_BODY)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        if text.len() <= MIN_TEXT_LEN {
            continue;
        }

        let rating = block
            .select(&REVIEW_STARS)
            .next()
            .map(|e| e.text().collect::<String>())
            .and_then(|alt| parse_star_rating(&alt))
            .unwrap_or(0.0);

        let author = block
            .select(&REVIEW_AUTHOR)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());

        let date = block
            .select(&REVIEW_DATE)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut review = RawReview::new(author, clip_text(&text), rating, date);
        review.title = block
            .select(&REVIEW_TITLE)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());
        review.verified = Some(block.select(&VERIFIED_BADGE).next().is_some());
        reviews.push(review);
    }

    reviews
}

/// Pull the leading number out of "4.0 out of 5 stars".
fn parse_star_rating(alt: &str) -> Option<f32> {
    STAR_RE
        .captures(alt)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|r| (0.0..=5.0).contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_rating_parses_alt_text() {
        assert_eq!(parse_star_rating("4.0 out of 5 stars"), Some(4.0));
        assert_eq!(parse_star_rating("5 out of 5 stars"), Some(5.0));
        assert_eq!(parse_star_rating("no stars here"), None);
    }

    #[test]
    fn extracts_reviews_from_product_page() {
        let html = r#"
            <div data-hook="review">
                <span class="a-profile-name">Jo</span>
                <a data-hook="review-title"><span>Great boots</span></a>
                <i data-hook="review-star-rating"><span class="a-icon-alt">5.0 out of 5 stars</span></i>
                <span data-hook="review-date">Reviewed on May 1, 2024</span>
                <span data-hook="review-body">Excellent quality, very comfortable after break-in.</span>
                <span data-hook="avp-badge">Verified Purchase</span>
            </div>
            <div data-hook="review">
                <span data-hook="review-body">Meh.</span>
            </div>
        "#;
        let doc = Html::parse_document(html);
        let reviews = extract_reviews(&doc, 10);
        assert_eq!(reviews.len(), 1, "short review body must be discarded");
        assert_eq!(reviews[0].rating, 5.0);
        assert_eq!(reviews[0].author, "Jo");
        assert_eq!(reviews[0].verified, Some(true));
    }

    #[test]
    fn first_product_url_joins_relative_href() {
        let html = r#"<a class="a-link-normal s-no-outline" href="/dp/B001"></a>"#;
        let doc = Html::parse_document(html);
        assert_eq!(first_product_url(&doc).as_deref(), Some("https://www.amazon.com/dp/B001"));
    }

    #[test]
    fn blocked_page_is_detected() {
        assert!(looks_blocked("please Enter the characters you see below"));
        assert!(!looks_blocked("<html>normal page</html>"));
    }
}
