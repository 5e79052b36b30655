//! Forum adapter: Reddit public search JSON.
//!
//! Searches a fixed multireddit of footwear/fashion communities for posts
//! about the query, then pulls top-level comments from the first few
//! threads. Post bodies under 50 chars and comments under 30 chars are
//! discarded, as are `[deleted]`/`[removed]` placeholders.

use chrono::DateTime;
use serde::Deserialize;

use super::{clip_text, SourceError};
use crate::models::RawReview;

const USER_AGENT: &str = "review-radar/0.1 (product review aggregator)";

/// Communities worth searching for product discussion.
const SUBREDDITS: [&str; 12] = [
    "BuyItForLife",
    "malefashionadvice",
    "femalefashionadvice",
    "frugalmalefashion",
    "frugalfemalefashion",
    "fashionreps",
    "sneakers",
    "goodyearwelt",
    "rawdenim",
    "DrMartens",
    "Boots",
    "fashion",
];

/// How many threads to open for comment extraction.
const COMMENT_THREADS: usize = 5;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    subreddit: String,
}

pub async fn fetch(
    http: &reqwest::Client,
    query: &str,
    limit: usize,
) -> Result<Vec<RawReview>, SourceError> {
    println!("🔍 Searching Reddit for: {}", query);

    let multireddit = SUBREDDITS.join("+");
    let url = format!(
        "https://www.reddit.com/r/{}/search.json?q={}&restrict_sr=1&limit=20&sort=relevance&t=all",
        multireddit,
        urlencoding::encode(query)
    );

    let listing: Listing = http
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .json()
        .await?;

    let mut reviews = Vec::new();
    let mut comment_threads = Vec::new();

    for thing in &listing.data.children {
        if reviews.len() >= limit {
            break;
        }
        let post = &thing.data;
        if post.selftext.len() > 50 && post.selftext != "[removed]" && post.selftext != "[deleted]" {
            let mut review = RawReview::new(
                post.author.clone().unwrap_or_else(|| "Anonymous".to_string()),
                clip_text(&post.selftext),
                0.0,
                epoch_to_date(post.created_utc),
            );
            review.title = Some(post.title.clone());
            review.score = Some(post.score);
            review.url = Some(format!("https://reddit.com{}", post.permalink));
            review.subreddit = Some(post.subreddit.clone());
            reviews.push(review);
        }
        if comment_threads.len() < COMMENT_THREADS && !post.permalink.is_empty() {
            comment_threads.push((post.permalink.clone(), post.title.clone()));
        }
    }

    // Top comments from the first few threads; a failed thread is skipped.
    for (permalink, post_title) in comment_threads {
        if reviews.len() >= limit {
            break;
        }
        match fetch_thread_comments(http, &permalink, &post_title, limit - reviews.len()).await {
            Ok(mut comments) => reviews.append(&mut comments),
            Err(e) => eprintln!("⚠️ Skipping thread {}: {}", permalink, e),
        }
    }

    println!("✅ Scraped {} Reddit reviews", reviews.len());
    Ok(reviews)
}

async fn fetch_thread_comments(
    http: &reqwest::Client,
    permalink: &str,
    post_title: &str,
    remaining: usize,
) -> Result<Vec<RawReview>, SourceError> {
    let url = format!("https://www.reddit.com{}.json?limit=10", permalink.trim_end_matches('/'));
    let payload: serde_json::Value = http
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .json()
        .await?;

    // Thread payload is [post listing, comment listing].
    let children = payload
        .get(1)
        .and_then(|l| l.pointer("/data/children"))
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let mut comments = Vec::new();
    for child in children.iter().take(5) {
        if comments.len() >= remaining {
            break;
        }
        if child.get("kind").and_then(|k| k.as_str()) != Some("t1") {
            continue;
        }
        let data = &child["data"];
        let body = data["body"].as_str().unwrap_or_default();
        if body.len() <= 30 || body == "[deleted]" || body == "[removed]" {
            continue;
        }
        let mut review = RawReview::new(
            data["author"].as_str().unwrap_or("Anonymous").to_string(),
            clip_text(body),
            0.0,
            epoch_to_date(data["created_utc"].as_f64().unwrap_or(0.0)),
        );
        let short_title: String = post_title.chars().take(50).collect();
        review.title = Some(format!("Comment on: {}...", short_title));
        review.score = data["score"].as_i64();
        review.url = data["permalink"].as_str().map(|p| format!("https://reddit.com{}", p));
        review.subreddit = data["subreddit"].as_str().map(String::from);
        comments.push(review);
    }
    Ok(comments)
}

fn epoch_to_date(epoch: f64) -> String {
    DateTime::from_timestamp(epoch as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_formats_as_ymd() {
        assert_eq!(epoch_to_date(1_700_000_000.0), "2023-11-14");
    }

    #[test]
    fn listing_parses_reddit_shape() {
        let json = r#"{
            "data": {"children": [
                {"kind": "t3", "data": {
                    "author": "bootfan", "selftext": "Owned these for two years, still going strong after daily wear in rain.",
                    "title": "1460 long term review", "created_utc": 1700000000.0,
                    "score": 42, "permalink": "/r/goodyearwelt/abc", "subreddit": "goodyearwelt"
                }}
            ]}
        }"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        assert_eq!(listing.data.children[0].data.score, 42);
    }
}
