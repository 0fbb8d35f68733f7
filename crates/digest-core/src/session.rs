//! Session facade.
//!
//! [`Session`] ties the [`ApiClient`] to the state slices: it marks a slice
//! pending, awaits the call, then applies the result or the error. Optimistic
//! votes and bookmark toggles are applied here before the request goes out
//! and rolled back if it fails. Locks on the slices are never held across an
//! `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{AdminResource, ApiClient, ApiError, ApiResult, CrawlSource, FeedQuery};
use crate::config::Config;
use crate::credentials::{CredentialStore, Credentials};
use crate::messages::Locale;
use crate::models::{Bookmark, DashboardStats, FeedItem, Page, SearchHistoryEntry, User};
use crate::store::LoadStatus;
use crate::store::admin::{AdminPage, AdminState, Pagination, PaginationMemory};
use crate::store::feed::{FeedMode, FeedState, FeedStore, INVALID_RESPONSE, RequestKey};
use crate::store::user::{self as user_store, UserState};
use crate::store::votes::{VoteCache, VoteTally};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Session {
    api: Arc<ApiClient>,
    locale: Locale,
    feed: Mutex<FeedStore>,
    user: Mutex<UserState>,
    admin: Mutex<AdminState>,
    votes: Mutex<VoteCache>,
    pagination: PaginationMemory,
}

impl Session {
    /// Opens the session stored under the digest home directory.
    ///
    /// # Errors
    /// Returns an error if stored credentials are unreadable or the base URL
    /// is invalid.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let credentials = Arc::new(CredentialStore::open_default()?);
        let api = Arc::new(ApiClient::from_config(config, credentials)?);
        Ok(Self::new(
            api,
            config.locale,
            config.page_size,
            VoteCache::open_default(),
            PaginationMemory::open_default(),
        ))
    }

    pub fn new(
        api: Arc<ApiClient>,
        locale: Locale,
        page_size: u32,
        votes: VoteCache,
        pagination: PaginationMemory,
    ) -> Self {
        Self {
            api,
            locale,
            feed: Mutex::new(FeedStore::new(page_size)),
            user: Mutex::new(UserState::default()),
            admin: Mutex::new(AdminState::default()),
            votes: Mutex::new(votes),
            pagination,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// User saved at login, if any.
    pub fn current_user(&self) -> Option<User> {
        self.api.credentials().user()
    }

    /// Localized text for an error.
    pub fn describe(&self, err: &ApiError) -> String {
        err.user_message(self.locale)
    }

    /// Localizes `err`; an expired session also wipes the local state.
    fn fail(&self, err: &ApiError) -> String {
        if err.is_session_expired() {
            self.reset_local();
        }
        self.describe(err)
    }

    fn reset_local(&self) {
        lock(&self.user).reset();
        lock(&self.admin).reset();
        lock(&self.feed).reset_all();
        if let Err(err) = lock(&self.votes).clear() {
            warn!(error = %format!("{err:#}"), "Failed to clear vote cache");
        }
    }

    fn remember_vote(&self, summary_id: &str, vote: Option<bool>) {
        if let Err(err) = lock(&self.votes).record(summary_id, vote) {
            warn!(error = %format!("{err:#}"), "Failed to write vote cache");
        }
    }

    // Auth

    /// Logs in and starts from empty slices.
    ///
    /// # Errors
    /// Returns an error for bad credentials or an unreachable service.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Credentials> {
        let creds = self.api.login(username, password).await?;
        self.reset_local();
        Ok(creds)
    }

    /// Clears tokens and every slice. Returns whether a session existed.
    ///
    /// # Errors
    /// Returns an error if the credentials file cannot be removed.
    pub fn logout(&self) -> ApiResult<bool> {
        let had = self.api.logout()?;
        self.reset_local();
        Ok(had)
    }

    // Feed

    pub fn feed_state(&self, mode: FeedMode, query: Option<&str>) -> Option<FeedState> {
        lock(&self.feed).get(&RequestKey::new(mode, query)).cloned()
    }

    pub fn reset_feed(&self, mode: FeedMode, query: Option<&str>) {
        lock(&self.feed).reset(mode, query);
    }

    pub fn reset_all_feeds(&self) {
        lock(&self.feed).reset_all();
    }

    /// Fetches one page of a feed into its request key.
    ///
    /// # Errors
    /// Returns the request error, or [`ApiError::InvalidResponse`] when the
    /// page has no `results`. Either way the error is recorded on the key.
    pub async fn fetch_feed(
        &self,
        mode: FeedMode,
        query: Option<&str>,
        page: u32,
    ) -> ApiResult<FeedState> {
        let key = RequestKey::new(mode, query);
        let page_size = {
            let mut feed = lock(&self.feed);
            feed.pending(&key);
            feed.page_size()
        };
        let request = FeedQuery {
            mode,
            search: query.map(str::to_string),
            page,
            page_size,
        };
        debug!(key = %key, page, "Fetching feed page");

        match self.api.feed_page(&request).await {
            Ok(Page {
                results: Some(results),
                count,
                ..
            }) => {
                let items: Vec<FeedItem> = {
                    let votes = lock(&self.votes);
                    results
                        .into_iter()
                        .map(|raw| {
                            let mut item = FeedItem::from(raw);
                            votes.apply_to(&mut item);
                            item
                        })
                        .collect()
                };
                lock(&self.feed).fulfilled(&key, page, items, count);
            }
            Ok(_) => {
                lock(&self.feed).rejected(&key, INVALID_RESPONSE);
                return Err(ApiError::InvalidResponse(format!(
                    "feed page {page} for '{key}' has no results"
                )));
            }
            Err(err) => {
                let message = self.fail(&err);
                lock(&self.feed).rejected(&key, message);
                return Err(err);
            }
        }

        Ok(lock(&self.feed).get(&key).cloned().unwrap_or_default())
    }

    /// Fetches the next page of a feed unless it is exhausted or loading.
    ///
    /// Returns `None` when nothing was fetched.
    ///
    /// # Errors
    /// Same as [`Session::fetch_feed`].
    pub async fn load_more(
        &self,
        mode: FeedMode,
        query: Option<&str>,
    ) -> ApiResult<Option<FeedState>> {
        let key = RequestKey::new(mode, query);
        let (page, ready) = {
            let feed = lock(&self.feed);
            match feed.get(&key) {
                Some(state) => (
                    state.current_page,
                    state.has_more && state.status != LoadStatus::Loading,
                ),
                None => (1, true),
            }
        };
        if !ready {
            return Ok(None);
        }
        self.fetch_feed(mode, query, page).await.map(Some)
    }

    /// Votes on a summary, showing the result before the server confirms it.
    ///
    /// Every stored copy of the summary is updated. If the request fails the
    /// previous counts and vote are put back; on success the server's counts
    /// replace the optimistic ones.
    ///
    /// # Errors
    /// Returns the request error after rolling back.
    pub async fn vote(&self, summary_id: &str, is_upvote: bool) -> ApiResult<VoteTally> {
        let previous = lock(&self.feed).find(summary_id).map(VoteTally::of);
        let cached = lock(&self.votes).get(summary_id);

        if let Some(previous) = previous {
            let optimistic = previous.apply(is_upvote);
            for item in lock(&self.feed).items_mut(summary_id) {
                optimistic.write_to(item);
            }
        }
        self.remember_vote(summary_id, Some(is_upvote));

        match self.api.send_feedback(summary_id, is_upvote).await {
            Ok(outcome) => {
                let confirmed = VoteTally::from(&outcome);
                for item in lock(&self.feed).items_mut(summary_id) {
                    confirmed.write_to(item);
                }
                self.remember_vote(summary_id, outcome.user_vote);
                Ok(confirmed)
            }
            Err(err) => {
                warn!(summary = summary_id, error = %err, "Vote failed, rolling back");
                if let Some(previous) = previous {
                    for item in lock(&self.feed).items_mut(summary_id) {
                        previous.write_to(item);
                    }
                }
                self.remember_vote(summary_id, cached);
                self.fail(&err);
                Err(err)
            }
        }
    }

    // User lists

    pub fn user_state(&self) -> UserState {
        lock(&self.user).clone()
    }

    /// # Errors
    /// Returns the request error, also recorded on the slice.
    pub async fn fetch_keywords(&self) -> ApiResult<Vec<String>> {
        lock(&self.user).favorite_keywords.pending();
        match self.api.favorite_keywords().await {
            Ok(keywords) => {
                lock(&self.user)
                    .favorite_keywords
                    .fulfilled(keywords.clone());
                Ok(keywords)
            }
            Err(err) => {
                let message = self.fail(&err);
                lock(&self.user).favorite_keywords.rejected(message);
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the request error; the slice records a per-keyword message.
    pub async fn add_keyword(&self, keyword: &str) -> ApiResult<Vec<String>> {
        match self.api.add_favorite_keyword(keyword).await {
            Ok(keywords) => {
                lock(&self.user).favorite_keywords.updated(keywords.clone());
                Ok(keywords)
            }
            Err(err) => {
                self.fail(&err);
                lock(&self.user)
                    .favorite_keywords
                    .action_failed(user_store::keyword_add_failed(keyword));
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the request error; the slice records a per-keyword message.
    pub async fn remove_keyword(&self, keyword: &str) -> ApiResult<Vec<String>> {
        match self.api.remove_favorite_keyword(keyword).await {
            Ok(keywords) => {
                lock(&self.user).favorite_keywords.updated(keywords.clone());
                Ok(keywords)
            }
            Err(err) => {
                self.fail(&err);
                lock(&self.user)
                    .favorite_keywords
                    .action_failed(user_store::keyword_remove_failed(keyword));
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the request error, also recorded on the slice.
    pub async fn fetch_history(&self) -> ApiResult<Vec<SearchHistoryEntry>> {
        lock(&self.user).search_history.pending();
        match self.api.search_history().await {
            Ok(entries) => {
                lock(&self.user).search_history.fulfilled(entries.clone());
                Ok(entries)
            }
            Err(err) => {
                let message = self.fail(&err);
                lock(&self.user).search_history.rejected(message);
                Err(err)
            }
        }
    }

    /// Saves a search, then reloads the history.
    ///
    /// # Errors
    /// Returns the request error; the slice records a per-query message.
    pub async fn add_history(&self, query: &str) -> ApiResult<Vec<SearchHistoryEntry>> {
        if let Err(err) = self.api.add_search_history(query).await {
            self.fail(&err);
            lock(&self.user)
                .search_history
                .action_failed(user_store::history_add_failed(query));
            return Err(err);
        }
        self.fetch_history().await
    }

    /// Deletes a saved search, then reloads the history.
    ///
    /// # Errors
    /// Returns the request error; the slice records a per-query message.
    pub async fn remove_history(&self, query: &str) -> ApiResult<Vec<SearchHistoryEntry>> {
        if let Err(err) = self.api.remove_search_history(query).await {
            self.fail(&err);
            lock(&self.user)
                .search_history
                .action_failed(user_store::history_remove_failed(query));
            return Err(err);
        }
        self.fetch_history().await
    }

    /// # Errors
    /// Returns the request error, also recorded on the slice.
    pub async fn fetch_bookmarks(&self) -> ApiResult<Vec<Bookmark>> {
        lock(&self.user).bookmarks.pending();
        match self.api.bookmarks().await {
            Ok(items) => {
                lock(&self.user).bookmarks.fulfilled(items.clone());
                Ok(items)
            }
            Err(err) => {
                let message = self.fail(&err);
                lock(&self.user).bookmarks.rejected(message);
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the request error; the slice records a per-article message.
    pub async fn add_bookmark(&self, article_id: &str) -> ApiResult<Vec<Bookmark>> {
        if let Err(err) = self.api.add_bookmark(article_id).await {
            self.fail(&err);
            lock(&self.user)
                .bookmarks
                .action_failed(user_store::bookmark_add_failed(article_id));
            return Err(err);
        }
        self.fetch_bookmarks().await
    }

    /// # Errors
    /// Returns the request error; the slice records a per-article message.
    pub async fn remove_bookmark(&self, article_id: &str) -> ApiResult<Vec<Bookmark>> {
        if let Err(err) = self.api.remove_bookmark(article_id).await {
            self.fail(&err);
            lock(&self.user)
                .bookmarks
                .action_failed(user_store::bookmark_remove_failed(article_id));
            return Err(err);
        }
        self.fetch_bookmarks().await
    }

    /// Saves or unsaves an article, updating the list first.
    ///
    /// Returns whether the article is saved afterwards. Loads the bookmark
    /// list first if it was never fetched.
    ///
    /// # Errors
    /// Returns the request error after restoring the previous membership.
    pub async fn toggle_bookmark(&self, article_id: &str) -> ApiResult<bool> {
        let never_loaded = lock(&self.user).bookmarks.status == LoadStatus::Idle;
        if never_loaded {
            self.fetch_bookmarks().await?;
        }

        let toggle = lock(&self.user).toggle_bookmark(article_id);
        let adding = toggle.is_add();
        let result = if adding {
            self.api.add_bookmark(article_id).await
        } else {
            self.api.remove_bookmark(article_id).await
        };

        match result {
            Ok(()) => {
                self.fetch_bookmarks().await?;
                Ok(adding)
            }
            Err(err) => {
                warn!(article = article_id, error = %err, "Bookmark update failed, rolling back");
                self.fail(&err);
                let message = if adding {
                    user_store::bookmark_add_failed(article_id)
                } else {
                    user_store::bookmark_remove_failed(article_id)
                };
                lock(&self.user).revert_bookmark(toggle, message);
                Err(err)
            }
        }
    }

    // Admin

    pub fn admin_state(&self) -> AdminState {
        lock(&self.admin).clone()
    }

    /// Admin calls need a staff account.
    fn require_staff(&self) -> ApiResult<()> {
        match self.current_user() {
            Some(user) if user.is_staff => Ok(()),
            _ => Err(ApiError::Refused(self.locale.admin_only().to_string())),
        }
    }

    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn load_dashboard(&self) -> ApiResult<DashboardStats> {
        self.require_staff()?;
        match self.api.admin_dashboard().await {
            Ok(stats) => {
                lock(&self.admin).stats = Some(stats.clone());
                Ok(stats)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Loads a page of an admin table.
    ///
    /// Missing `page`/`page_size` come from the remembered position. A page
    /// past the end (or a 404) restarts at page 1. The position that loaded
    /// is remembered for next time.
    ///
    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn load_admin_table(
        &self,
        resource: AdminResource,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> ApiResult<AdminPage> {
        self.require_staff()?;
        let saved = self.pagination.load();
        let page_size = page_size.unwrap_or(saved.page_size).max(1);
        let mut page = page.unwrap_or(saved.current).max(1);

        lock(&self.admin).loading = true;
        let result = loop {
            match self.api.admin_list(resource, page, page_size).await {
                Ok(body) => {
                    let pagination = Pagination {
                        current: page,
                        page_size,
                        total: body.count,
                    };
                    if page > pagination.max_page() {
                        debug!(%resource, page, "Page past the end, restarting at 1");
                        page = 1;
                        continue;
                    }
                    break Ok(AdminPage {
                        rows: body.results.unwrap_or_default(),
                        pagination,
                    });
                }
                Err(err) if err.status() == Some(404) && page > 1 => {
                    debug!(%resource, page, "Page not found, restarting at 1");
                    page = 1;
                }
                Err(err) => break Err(err),
            }
        };

        let mut admin = lock(&self.admin);
        admin.loading = false;
        match result {
            Ok(loaded) => {
                if let Err(err) = self.pagination.save(loaded.pagination) {
                    warn!(error = %format!("{err:#}"), "Failed to remember admin pagination");
                }
                admin.set_rows(resource, loaded.rows.clone(), loaded.pagination);
                Ok(loaded)
            }
            Err(err) => {
                drop(admin);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Deletes a row, then reloads the table.
    ///
    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn delete_admin_row(
        &self,
        resource: AdminResource,
        id: &str,
    ) -> ApiResult<AdminPage> {
        self.require_staff()?;
        if let Err(err) = self.api.admin_delete(resource, id).await {
            self.fail(&err);
            return Err(err);
        }
        info!(%resource, id, "Deleted admin row");
        self.load_admin_table(resource, None, None).await
    }

    /// Locks or unlocks an account by id.
    ///
    /// The account is looked up in the users table (loading it if needed) so
    /// staff accounts are refused locally.
    ///
    /// # Errors
    /// Returns [`ApiError::StaffAccount`] for staff targets,
    /// [`ApiError::Refused`] for non-staff callers, or the request error.
    pub async fn set_user_active(&self, user_id: &str, active: bool) -> ApiResult<User> {
        self.require_staff()?;
        let mut target = self.find_admin_user(user_id);
        if target.is_none() {
            self.load_admin_table(AdminResource::Users, None, None)
                .await?;
            target = self.find_admin_user(user_id);
        }
        let target = target.unwrap_or_else(|| User {
            id: user_id.to_string(),
            ..User::default()
        });

        match self.api.admin_set_user_active(&target, active).await {
            Ok(updated) => {
                let mut admin = lock(&self.admin);
                if let Some(rows) = admin.tables.get_mut(&AdminResource::Users) {
                    rows.iter_mut()
                        .filter(|row| row_id(row).as_deref() == Some(user_id))
                        .for_each(|row| row["is_active"] = Value::Bool(active));
                }
                Ok(updated)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn find_admin_user(&self, user_id: &str) -> Option<User> {
        let admin = lock(&self.admin);
        admin
            .rows(AdminResource::Users)
            .iter()
            .find(|row| row_id(row).as_deref() == Some(user_id))
            .and_then(|row| serde_json::from_value(row.clone()).ok())
    }

    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn crawl(&self, source: CrawlSource) -> ApiResult<Value> {
        self.require_staff()?;
        self.api.admin_crawl(source).await.inspect_err(|err| {
            self.fail(err);
        })
    }

    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn summarize(&self, article_id: Option<&str>) -> ApiResult<Value> {
        self.require_staff()?;
        self.api
            .trigger_summarize(article_id)
            .await
            .inspect_err(|err| {
                self.fail(err);
            })
    }

    /// Loads users following `keyword` and selects it.
    ///
    /// # Errors
    /// Returns [`ApiError::Refused`] for non-staff accounts, or the request error.
    pub async fn load_keyword_users(&self, keyword: &str, page: u32) -> ApiResult<AdminPage> {
        self.require_staff()?;
        let page_size = lock(&self.admin).keyword_users_pagination.page_size;
        let page = page.max(1);

        match self.api.admin_keyword_users(keyword, page, page_size).await {
            Ok(body) => {
                let loaded = AdminPage {
                    pagination: Pagination {
                        current: page,
                        page_size,
                        total: body.count,
                    },
                    rows: body.results.unwrap_or_default(),
                };
                lock(&self.admin).set_keyword_users(
                    keyword,
                    loaded.rows.clone(),
                    loaded.pagination,
                );
                Ok(loaded)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    pub fn clear_keyword_users(&self) {
        lock(&self.admin).clear_keyword_users();
    }
}

/// Row id as a string (ids are UUIDs or integers).
fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::REFRESH_PATH;

    fn summary(id: &str, upvotes: i64, downvotes: i64) -> Value {
        json!({
            "id": id,
            "article_id": format!("art-{id}"),
            "title": format!("Tin {id}"),
            "summary_text": "Tóm tắt",
            "upvotes": upvotes,
            "downvotes": downvotes,
            "user_vote": null
        })
    }

    fn session_with(server: &MockServer, user: Option<User>, page_size: u32) -> Session {
        let credentials = Arc::new(CredentialStore::in_memory(Some(Credentials {
            access: "tok".to_string(),
            refresh: Some("ref".to_string()),
            user,
        })));
        let api = Arc::new(
            ApiClient::new(&server.uri(), Duration::from_secs(5), credentials).unwrap(),
        );
        Session::new(
            api,
            Locale::Vi,
            page_size,
            VoteCache::in_memory(),
            PaginationMemory::in_memory(),
        )
    }

    fn session(server: &MockServer) -> Session {
        session_with(server, None, 2)
    }

    fn staff() -> User {
        User {
            id: "1".to_string(),
            username: "admin".to_string(),
            is_staff: true,
            ..User::default()
        }
    }

    async fn mount_recommended(server: &MockServer, offset: &str, ids: &[&str], count: u64) {
        let results: Vec<Value> = ids.iter().map(|id| summary(id, 1, 0)).collect();
        Mock::given(method("GET"))
            .and(path("/recommender/recommendations/"))
            .and(query_param("offset", offset))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "count": count, "results": results })),
            )
            .mount(server)
            .await;
    }

    /// Test: the union of fetched pages has no duplicate ids and keeps
    /// arrival order.
    #[tokio::test]
    async fn test_load_more_deduplicates_pages() {
        let server = MockServer::start().await;
        mount_recommended(&server, "0", &["s1", "s2"], 5).await;
        mount_recommended(&server, "2", &["s2", "s3"], 5).await;
        mount_recommended(&server, "4", &["s4"], 5).await;

        let session = session(&server);
        let mut last = None;
        while let Some(state) = session
            .load_more(FeedMode::Recommended, None)
            .await
            .unwrap()
        {
            last = Some(state);
        }

        let state = last.unwrap();
        let ids: Vec<_> = state.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3", "s4"]);
        assert!(!state.has_more);
        assert_eq!(state.current_page, 4);
        assert_eq!(state.items[0].title, "Tin s1");
    }

    #[tokio::test]
    async fn test_feed_without_results_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/summarizer/summaries/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0 })))
            .mount(&server)
            .await;

        let session = session(&server);
        let err = session
            .fetch_feed(FeedMode::Trending, None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));

        let state = session.feed_state(FeedMode::Trending, None).unwrap();
        assert_eq!(state.status, LoadStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(INVALID_RESPONSE));
    }

    /// Test: a failed vote puts back the exact previous counts and vote.
    #[tokio::test]
    async fn test_vote_rolls_back_on_failure() {
        let server = MockServer::start().await;
        mount_recommended(&server, "0", &["s1"], 1).await;
        Mock::given(method("POST"))
            .and(path("/summarizer/feedback/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server);
        session
            .fetch_feed(FeedMode::Recommended, None, 1)
            .await
            .unwrap();
        let before = session.feed_state(FeedMode::Recommended, None).unwrap();

        let err = session.vote("s1", false).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            session.feed_state(FeedMode::Recommended, None).unwrap(),
            before
        );
        assert_eq!(lock(&session.votes).get("s1"), None);
    }

    #[tokio::test]
    async fn test_vote_success_uses_server_counts() {
        let server = MockServer::start().await;
        mount_recommended(&server, "0", &["s1"], 1).await;
        Mock::given(method("POST"))
            .and(path("/summarizer/feedback/"))
            .and(body_json(json!({ "summary_id": "s1", "is_upvote": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary_id": "s1",
                "upvotes": 7,
                "downvotes": 3,
                "user_vote": true
            })))
            .mount(&server)
            .await;

        let session = session(&server);
        session
            .fetch_feed(FeedMode::Recommended, None, 1)
            .await
            .unwrap();
        let tally = session.vote("s1", true).await.unwrap();
        assert_eq!((tally.upvotes, tally.downvotes), (7, 3));

        let state = session.feed_state(FeedMode::Recommended, None).unwrap();
        assert_eq!(state.items[0].upvotes, 7);
        assert_eq!(state.items[0].user_vote, Some(true));
        assert_eq!(lock(&session.votes).get("s1"), Some(true));
    }

    /// Test: a failed toggle restores the list and records the message.
    #[tokio::test]
    async fn test_toggle_bookmark_reverts_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/bookmarks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "article": { "id": "a1", "title": "Một" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/bookmarks"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "article_id": ["Bài viết không tồn tại."]
            })))
            .mount(&server)
            .await;

        let session = session(&server);
        let err = session.toggle_bookmark("a9").await.unwrap_err();
        assert_eq!(session.describe(&err), "Bài viết không tồn tại.");

        let state = session.user_state();
        assert!(!state.is_bookmarked("a9"));
        assert!(state.is_bookmarked("a1"));
        assert_eq!(
            state.bookmarks.error.as_deref(),
            Some("Không thể lưu bài viết (ID: a9).")
        );
    }

    #[tokio::test]
    async fn test_toggle_bookmark_removes_then_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/bookmarks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "article": { "id": "a1" } },
                { "article": { "id": "a2" } }
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/bookmarks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "article": { "id": "a2" } }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/user/bookmarks"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server);
        assert!(!session.toggle_bookmark("a1").await.unwrap());
        let state = session.user_state();
        assert!(!state.is_bookmarked("a1"));
        assert_eq!(state.bookmarks.items.len(), 1);
        assert_eq!(state.bookmarks.status, LoadStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_keyword_failure_keeps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/fav-words"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "favorite_keywords": ["AI"] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/user/fav-words"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let session = session(&server);
        session.fetch_keywords().await.unwrap();
        session.remove_keyword("AI").await.unwrap_err();

        let keywords = session.user_state().favorite_keywords;
        assert_eq!(keywords.items, vec!["AI"]);
        assert_eq!(
            keywords.error.as_deref(),
            Some("Không thể xóa từ khóa \"AI\".")
        );
    }

    /// Test: a session that cannot be refreshed wipes every slice.
    #[tokio::test]
    async fn test_expired_session_resets_slices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/fav-words"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "favorite_keywords": ["AI"] })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/search-history"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server);
        session.fetch_keywords().await.unwrap();
        let err = session.fetch_history().await.unwrap_err();
        assert!(err.is_session_expired());

        let state = session.user_state();
        assert!(state.favorite_keywords.items.is_empty());
        assert!(state.search_history.items.is_empty());
        assert!(!session.api().credentials().is_logged_in());
    }

    #[tokio::test]
    async fn test_admin_requires_staff() {
        let server = MockServer::start().await;
        let session = session(&server);
        let err = session.load_dashboard().await.unwrap_err();
        assert!(matches!(err, ApiError::Refused(_)));
    }

    /// Test: a remembered page past the end restarts at page 1 and the new
    /// position is remembered.
    #[tokio::test]
    async fn test_admin_table_restarts_past_last_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/admin/users/"))
            .and(query_param("page", "5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "count": 12, "results": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/admin/users/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 12,
                "results": [{ "id": 1, "username": "admin", "is_staff": true }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let memory_path = dir.path().join("admin_pagination.json");
        PaginationMemory::at(memory_path.clone())
            .save(Pagination {
                current: 5,
                page_size: 10,
                total: 0,
            })
            .unwrap();

        let mut session = session_with(&server, Some(staff()), 10);
        session.pagination = PaginationMemory::at(memory_path.clone());

        let loaded = session
            .load_admin_table(AdminResource::Users, None, None)
            .await
            .unwrap();
        assert_eq!(loaded.pagination.current, 1);
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(PaginationMemory::at(memory_path).load().current, 1);
        assert!(!session.admin_state().loading);

        // The loaded row is staff, so locking it is refused locally.
        let err = session.set_user_active("1", false).await.unwrap_err();
        assert!(matches!(err, ApiError::StaffAccount(_)));
    }
}
