use serde_json::json;

use super::client::{ApiClient, ApiRequest};
use super::error::ApiResult;
use crate::models::{Bookmark, BookmarkList, FavoriteKeywords, Listing, SearchHistoryEntry};

const FAV_WORDS: &str = "/user/fav-words";
const SEARCH_HISTORY: &str = "/user/search-history";
const BOOKMARKS: &str = "/user/bookmarks";

impl ApiClient {
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn favorite_keywords(&self) -> ApiResult<Vec<String>> {
        let body: FavoriteKeywords = self.json(&ApiRequest::get(FAV_WORDS)).await?;
        Ok(body.favorite_keywords)
    }

    /// Adds a keyword and returns the updated list.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn add_favorite_keyword(&self, keyword: &str) -> ApiResult<Vec<String>> {
        let request = ApiRequest::patch(FAV_WORDS).json(json!({ "keywords": [keyword] }));
        let body: FavoriteKeywords = self.json(&request).await?;
        Ok(body.favorite_keywords)
    }

    /// Removes a keyword and returns the updated list.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn remove_favorite_keyword(&self, keyword: &str) -> ApiResult<Vec<String>> {
        let request = ApiRequest::delete(FAV_WORDS).json(json!({ "keywords": [keyword] }));
        let body: FavoriteKeywords = self.json(&request).await?;
        Ok(body.favorite_keywords)
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn search_history(&self) -> ApiResult<Vec<SearchHistoryEntry>> {
        let listing: Listing<SearchHistoryEntry> =
            self.json(&ApiRequest::get(SEARCH_HISTORY)).await?;
        Ok(listing.into_vec())
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn add_search_history(&self, query: &str) -> ApiResult<()> {
        self.empty(&ApiRequest::post(SEARCH_HISTORY).json(json!({ "query": query.trim() })))
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn remove_search_history(&self, query: &str) -> ApiResult<()> {
        self.empty(&ApiRequest::delete(SEARCH_HISTORY).json(json!({ "queries": [query] })))
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn bookmarks(&self) -> ApiResult<Vec<Bookmark>> {
        let list: BookmarkList = self.json(&ApiRequest::get(BOOKMARKS)).await?;
        Ok(list.into_vec())
    }

    /// # Errors
    /// Returns an error if the request fails or the article does not exist.
    pub async fn add_bookmark(&self, article_id: &str) -> ApiResult<()> {
        self.empty(&ApiRequest::post(BOOKMARKS).json(json!({ "article_id": article_id })))
            .await
    }

    /// Removes a saved article.
    ///
    /// The service validates `article_id`; older deployments read
    /// `article_ids`, so both are sent.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn remove_bookmark(&self, article_id: &str) -> ApiResult<()> {
        self.empty(
            &ApiRequest::delete(BOOKMARKS)
                .json(json!({ "article_id": article_id, "article_ids": [article_id] })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::CredentialStore;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(
            &server.uri(),
            Duration::from_secs(5),
            Arc::new(CredentialStore::in_memory(None)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_keyword_patch_returns_new_list() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(FAV_WORDS))
            .and(body_json(json!({ "keywords": ["kinh tế"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "favorite_keywords": ["bóng đá", "kinh tế"]
            })))
            .mount(&server)
            .await;

        let keywords = client(&server)
            .add_favorite_keyword("kinh tế")
            .await
            .unwrap();
        assert_eq!(keywords, vec!["bóng đá", "kinh tế"]);
    }

    #[tokio::test]
    async fn test_search_history_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_HISTORY))
            .and(body_json(json!({ "query": "giá vàng" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .add_search_history("  giá vàng ")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bookmark_delete_sends_both_id_forms() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(BOOKMARKS))
            .and(body_json(json!({ "article_id": "a1", "article_ids": ["a1"] })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).remove_bookmark("a1").await.unwrap();
    }
}
