//! Video-platform adapter: YouTube Data API v3.
//!
//! Searches for review videos (query + " review"), then pulls top comments
//! from each result. Comments never carry a star rating, so `rating` stays
//! 0.0 and the classifier relies on text alone. Requires `YOUTUBE_API_KEY`;
//! without it the source degrades to a `MissingCredential` error that the
//! aggregation absorbs.

use serde::Deserialize;

use super::{clip_text, SourceError};
use crate::models::RawReview;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const COMMENTS_URL: &str = "https://www.googleapis.com/youtube/v3/commentThreads";

/// How many videos to harvest comments from.
const MAX_VIDEOS: usize = 10;
/// Comments below this length carry no usable signal.
const MIN_COMMENT_LEN: usize = 30;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "authorDisplayName", default)]
    author: String,
    #[serde(rename = "textDisplay", default)]
    text: String,
    #[serde(rename = "publishedAt", default)]
    published_at: String,
    #[serde(rename = "likeCount", default)]
    like_count: i64,
}

pub async fn fetch(
    http: &reqwest::Client,
    api_key: Option<&str>,
    query: &str,
    limit: usize,
) -> Result<Vec<RawReview>, SourceError> {
    let api_key = api_key.ok_or(SourceError::MissingCredential("YOUTUBE_API_KEY"))?;

    println!("🎥 Searching YouTube for: {}", query);

    let max_results = MAX_VIDEOS.to_string();
    let search_query = format!("{} review", query);
    let search: SearchResponse = http
        .get(SEARCH_URL)
        .query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("order", "relevance"),
            ("relevanceLanguage", "en"),
            ("q", search_query.as_str()),
            ("key", api_key),
        ])
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .json()
        .await?;

    let videos: Vec<(String, String, String)> = search
        .items
        .into_iter()
        .filter_map(|item| {
            item.id
                .video_id
                .map(|id| (id, item.snippet.title, item.snippet.channel_title))
        })
        .collect();

    if videos.is_empty() {
        println!("⚠️ No YouTube videos found for query");
        return Ok(vec![]);
    }

    let mut reviews = Vec::new();
    for (video_id, video_title, channel) in videos {
        if reviews.len() >= limit {
            break;
        }
        let batch = (limit - reviews.len()).min(10);
        // Comments may be disabled per video; skip and move on.
        let threads = match fetch_comments(http, api_key, &video_id, batch).await {
            Ok(t) => t,
            Err(e) => {
                eprintln!("⚠️ Comments unavailable for video {}: {}", video_id, e);
                continue;
            }
        };

        for thread in threads {
            if reviews.len() >= limit {
                break;
            }
            let comment = thread.snippet.top_level_comment.snippet;
            if comment.text.len() < MIN_COMMENT_LEN {
                continue;
            }
            let date = comment.published_at.chars().take(10).collect::<String>();
            let mut review = RawReview::new(comment.author, clip_text(&comment.text), 0.0, date);
            review.video_title = Some(video_title.clone());
            review.video_url = Some(format!("https://www.youtube.com/watch?v={}", video_id));
            review.channel = Some(channel.clone());
            review.likes = Some(comment.like_count);
            reviews.push(review);
        }
    }

    println!("✅ Collected {} YouTube comments", reviews.len());
    Ok(reviews)
}

async fn fetch_comments(
    http: &reqwest::Client,
    api_key: &str,
    video_id: &str,
    max_results: usize,
) -> Result<Vec<CommentThread>, SourceError> {
    let max_results = max_results.to_string();
    let response: CommentThreadsResponse = http
        .get(COMMENTS_URL)
        .query(&[
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("order", "relevance"),
            ("textFormat", "plainText"),
            ("key", api_key),
        ])
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SourceError::Blocked(e.to_string()))?
        .json()
        .await?;
    Ok(response.items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = reqwest::Client::new();
        let result = fetch(&client, None, "dr martens 1460", 10).await;
        assert!(matches!(result, Err(SourceError::MissingCredential("YOUTUBE_API_KEY"))));
    }

    #[test]
    fn comment_thread_parses_api_shape() {
        let json = r#"{
            "items": [{"snippet": {"topLevelComment": {"snippet": {
                "authorDisplayName": "viewer",
                "textDisplay": "Bought a pair after this video, zero regrets so far.",
                "publishedAt": "2024-05-01T10:00:00Z",
                "likeCount": 7
            }}}}]
        }"#;
        let parsed: CommentThreadsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].snippet.top_level_comment.snippet.like_count, 7);
    }
}
