use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use super::client::{ApiClient, ApiRequest};
use super::error::{ApiError, ApiResult};
use crate::models::{DashboardStats, Page, User};

/// Tables exposed by the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdminResource {
    Users,
    Articles,
    Summaries,
    Comments,
    FavWords,
}

impl AdminResource {
    pub const ALL: [AdminResource; 5] = [
        AdminResource::Users,
        AdminResource::Articles,
        AdminResource::Summaries,
        AdminResource::Comments,
        AdminResource::FavWords,
    ];

    /// Path segment under `/user/admin/`.
    pub fn as_str(self) -> &'static str {
        match self {
            AdminResource::Users => "users",
            AdminResource::Articles => "articles",
            AdminResource::Summaries => "summaries",
            AdminResource::Comments => "comments",
            AdminResource::FavWords => "fav-words",
        }
    }
}

impl fmt::Display for AdminResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|r| r.as_str()).collect();
                format!("unknown admin table '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// News sources the crawler knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlSource {
    Baomoi,
    Vnexpress,
}

impl CrawlSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CrawlSource::Baomoi => "baomoi",
            CrawlSource::Vnexpress => "vnexpress",
        }
    }
}

impl FromStr for CrawlSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baomoi" => Ok(CrawlSource::Baomoi),
            "vnexpress" => Ok(CrawlSource::Vnexpress),
            other => Err(format!(
                "unknown source '{other}' (expected baomoi or vnexpress)"
            )),
        }
    }
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn admin_dashboard(&self) -> ApiResult<DashboardStats> {
        self.json(&ApiRequest::get("/user/admin/dashboard/")).await
    }

    /// Rows are kept as raw JSON; each table has its own columns.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn admin_list(
        &self,
        resource: AdminResource,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Value>> {
        self.json(
            &ApiRequest::get(format!("/user/admin/{resource}/"))
                .query("page", page)
                .query("page_size", page_size),
        )
        .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn admin_delete(&self, resource: AdminResource, id: &str) -> ApiResult<()> {
        self.empty(&ApiRequest::delete(format!("/user/admin/{resource}/{id}/")))
            .await
    }

    /// Locks or unlocks an account. Staff accounts are never locked.
    ///
    /// # Errors
    /// Returns [`ApiError::StaffAccount`] for staff accounts, or the request error.
    pub async fn admin_set_user_active(&self, user: &User, active: bool) -> ApiResult<User> {
        if user.is_staff && !active {
            return Err(ApiError::StaffAccount(user.username.clone()));
        }
        self.json(
            &ApiRequest::patch(format!("/user/admin/users/{}/", user.id))
                .json(json!({ "is_active": active })),
        )
        .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn admin_crawl(&self, source: CrawlSource) -> ApiResult<Value> {
        self.json(&ApiRequest::post("/user/admin/crawl/").json(json!({ "source": source.as_str() })))
            .await
    }

    /// Queues summarization for one article, or for every unsummarized one.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn trigger_summarize(&self, article_id: Option<&str>) -> ApiResult<Value> {
        let path = match article_id {
            Some(id) => format!("/summarizer/summaries/trigger-single/{id}/"),
            None => "/summarizer/summaries/trigger-bulk/".to_string(),
        };
        self.json(&ApiRequest::post(path)).await
    }

    /// Users who follow `keyword`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn admin_keyword_users(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Value>> {
        self.json(
            &ApiRequest::get("/user/admin/fav-words/")
                .query("keyword", keyword)
                .query("page", page)
                .query("page_size", page_size),
        )
        .await
    }
}
