use serde_json::json;

use super::client::{ApiClient, ApiRequest};
use super::error::ApiResult;
use crate::models::{Comment, Listing, Page, Summary, VoteOutcome};
use crate::store::feed::FeedMode;

/// One page of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub mode: FeedMode,
    /// A non-empty query switches to search regardless of `mode`.
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

/// Builds the request for a feed page.
///
/// Search and trending are page-numbered; recommendations are offset-based.
pub fn feed_request(query: &FeedQuery) -> ApiRequest {
    let page = query.page.max(1);
    match query.search.as_deref().filter(|q| !q.is_empty()) {
        Some(q) => ApiRequest::get("/summarizer/summaries/search/")
            .query("q", q)
            .query("page", page)
            .query("page_size", query.page_size),
        None => match query.mode {
            FeedMode::Trending => ApiRequest::get("/summarizer/summaries/")
                .query("sort_by", "-created_at")
                .query("page", page)
                .query("page_size", query.page_size),
            FeedMode::Recommended => ApiRequest::get("/recommender/recommendations/")
                .query("limit", query.page_size)
                .query("offset", (page - 1) * query.page_size),
        },
    }
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the request fails or the body is not a page.
    pub async fn feed_page(&self, query: &FeedQuery) -> ApiResult<Page<Summary>> {
        self.json(&feed_request(query)).await
    }

    /// Records an up or down vote on a summary.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn send_feedback(&self, summary_id: &str, is_upvote: bool) -> ApiResult<VoteOutcome> {
        self.json(
            &ApiRequest::post("/summarizer/feedback/")
                .json(json!({ "summary_id": summary_id, "is_upvote": is_upvote })),
        )
        .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn comments(&self, summary_id: &str) -> ApiResult<Vec<Comment>> {
        let listing: Listing<Comment> = self
            .json(&ApiRequest::get(format!(
                "/news/summaries/{summary_id}/comments/"
            )))
            .await?;
        Ok(listing.into_vec())
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn add_comment(&self, summary_id: &str, content: &str) -> ApiResult<Comment> {
        self.json(
            &ApiRequest::post(format!("/news/summaries/{summary_id}/comments/"))
                .json(json!({ "content": content })),
        )
        .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete_comment(&self, comment_id: &str) -> ApiResult<()> {
        self.empty(&ApiRequest::delete(format!("/news/comments/{comment_id}/")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: FeedMode, search: Option<&str>, page: u32) -> FeedQuery {
        FeedQuery {
            mode,
            search: search.map(str::to_string),
            page,
            page_size: 10,
        }
    }

    fn params(request: &ApiRequest) -> Vec<(String, String)> {
        request.query_pairs().to_vec()
    }

    #[test]
    fn test_recommended_uses_offset() {
        let request = feed_request(&query(FeedMode::Recommended, None, 3));
        assert_eq!(request.path(), "/recommender/recommendations/");
        assert_eq!(
            params(&request),
            vec![
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "20".to_string())
            ]
        );
    }

    #[test]
    fn test_trending_sorts_by_creation() {
        let request = feed_request(&query(FeedMode::Trending, None, 1));
        assert_eq!(request.path(), "/summarizer/summaries/");
        assert!(params(&request).contains(&("sort_by".to_string(), "-created_at".to_string())));
        assert!(params(&request).contains(&("page".to_string(), "1".to_string())));
    }

    /// Test: a search query overrides the mode; an empty one does not.
    #[test]
    fn test_search_overrides_mode() {
        let request = feed_request(&query(FeedMode::Recommended, Some("bão"), 2));
        assert_eq!(request.path(), "/summarizer/summaries/search/");
        assert!(params(&request).contains(&("q".to_string(), "bão".to_string())));
        assert!(params(&request).contains(&("page".to_string(), "2".to_string())));

        let request = feed_request(&query(FeedMode::Trending, Some(""), 1));
        assert_eq!(request.path(), "/summarizer/summaries/");
    }
}
