//! Paginated feeds keyed by request key.
//!
//! Every combination of feed mode and search query gets its own
//! [`FeedState`], so switching between the recommended feed, the trending
//! feed and a search never mixes their pages.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::LoadStatus;
use crate::models::FeedItem;

/// Error recorded when a page comes back without `results`.
pub const INVALID_RESPONSE: &str = "Invalid API response structure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    #[default]
    Recommended,
    Trending,
}

impl FeedMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedMode::Recommended => "recommended",
            FeedMode::Trending => "trending",
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recommended" => Ok(FeedMode::Recommended),
            "trending" => Ok(FeedMode::Trending),
            other => Err(format!("unknown feed mode '{other}'")),
        }
    }
}

/// `search:<query>` when searching, otherwise the mode name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(mode: FeedMode, query: Option<&str>) -> Self {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => Self(format!("search:{q}")),
            None => Self(mode.as_str().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pages fetched so far for one request key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedState {
    pub items: Vec<FeedItem>,
    pub status: LoadStatus,
    pub error: Option<String>,
    /// Next page to fetch (1-based).
    pub current_page: u32,
    pub total_count: u64,
    pub has_more: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: LoadStatus::Idle,
            error: None,
            current_page: 1,
            total_count: 0,
            has_more: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedStore {
    requests: HashMap<RequestKey, FeedState>,
    page_size: u32,
}

impl FeedStore {
    pub fn new(page_size: u32) -> Self {
        Self {
            requests: HashMap::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn get(&self, key: &RequestKey) -> Option<&FeedState> {
        self.requests.get(key)
    }

    /// Page to request next for `key`.
    pub fn next_page(&self, key: &RequestKey) -> u32 {
        self.requests.get(key).map_or(1, |state| state.current_page)
    }

    pub fn pending(&mut self, key: &RequestKey) {
        self.requests.entry(key.clone()).or_default().status = LoadStatus::Loading;
    }

    /// Merges a fetched page.
    ///
    /// Page 1 replaces the items; later pages append. Either way an id
    /// already present is skipped. A key reset while its request was in
    /// flight stays reset.
    pub fn fulfilled(&mut self, key: &RequestKey, page: u32, items: Vec<FeedItem>, total: u64) {
        let page_size = u64::from(self.page_size);
        let Some(state) = self.requests.get_mut(key) else {
            return;
        };

        if page <= 1 {
            state.items.clear();
        }
        let mut seen: HashSet<String> = state.items.iter().map(|item| item.id.clone()).collect();
        for item in items {
            if seen.insert(item.id.clone()) {
                state.items.push(item);
            }
        }
        state.status = LoadStatus::Succeeded;
        state.total_count = total;
        state.has_more = u64::from(page) * page_size < total;
        state.current_page = page + 1;
        state.error = None;
    }

    pub fn rejected(&mut self, key: &RequestKey, error: impl Into<String>) {
        if let Some(state) = self.requests.get_mut(key) {
            state.status = LoadStatus::Failed;
            state.error = Some(error.into());
        }
    }

    pub fn reset(&mut self, mode: FeedMode, query: Option<&str>) {
        self.requests.remove(&RequestKey::new(mode, query));
    }

    pub fn reset_all(&mut self) {
        self.requests.clear();
    }

    /// Every stored copy of a summary, across all request keys.
    pub fn items_mut<'a>(&'a mut self, summary_id: &'a str) -> impl Iterator<Item = &'a mut FeedItem> {
        self.requests
            .values_mut()
            .flat_map(|state| state.items.iter_mut())
            .filter(move |item| item.id == summary_id)
    }

    /// First stored copy of a summary.
    pub fn find(&self, summary_id: &str) -> Option<&FeedItem> {
        self.requests
            .values()
            .flat_map(|state| state.items.iter())
            .find(|item| item.id == summary_id)
    }
}
