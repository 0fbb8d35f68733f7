//! REST resource mirrors.
//!
//! These follow the JSON the service returns. Fields the service may omit or
//! send as `null` are lenient; ids arrive as UUID strings from most endpoints
//! and as integers from a few, so both are accepted and kept as strings.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder title for summaries without one.
pub const UNTITLED: &str = "Không có tiêu đề";
/// Placeholder body for summaries without text.
pub const NO_SUMMARY: &str = "Không có tóm tắt";
/// Source link used when the article has no URL.
pub const NO_LINK: &str = "#";

mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_id(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_to_id(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(value_to_id(Value::deserialize(d)?))
    }

    /// Counts may be missing or `null` on freshly created rows.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.unwrap_or(0))
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
    }
}

/// Account as returned by login and the profile endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    pub categories: Vec<Category>,
}

/// A summary as it comes off the wire from the feed endpoints.
///
/// Recommendations, search results and the summaries list do not agree on
/// where title/url/image live, so everything is optional here and
/// [`FeedItem::from`] decides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(deserialize_with = "de::opt_id")]
    pub article_id: Option<String>,
    pub article: Option<Article>,
    pub title: Option<String>,
    pub summary_text: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    #[serde(deserialize_with = "de::strings")]
    pub keywords: Vec<String>,
    pub published_at: Option<String>,
    #[serde(deserialize_with = "de::count")]
    pub upvotes: i64,
    #[serde(deserialize_with = "de::count")]
    pub downvotes: i64,
    pub user_vote: Option<bool>,
    #[serde(deserialize_with = "de::count")]
    pub comment_count: i64,
}

/// Normalized feed entry kept in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub article_id: Option<String>,
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub keywords: Vec<String>,
    pub published_at: Option<String>,
    pub user_vote: Option<bool>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
}

impl FeedItem {
    /// Publication time, when the service sent a parseable RFC 3339 value.
    pub fn published(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.published_at.as_deref()?)
    }
}

/// Parses the RFC 3339 timestamps the service emits.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<Summary> for FeedItem {
    fn from(raw: Summary) -> Self {
        let article = raw.article.unwrap_or_default();
        let title = non_empty(raw.title)
            .or_else(|| non_empty(article.title))
            .unwrap_or_else(|| UNTITLED.to_string());
        let summary = non_empty(raw.summary_text)
            .or_else(|| non_empty(raw.summary))
            .unwrap_or_else(|| NO_SUMMARY.to_string());
        let source_url = non_empty(raw.url)
            .or_else(|| non_empty(article.url))
            .unwrap_or_else(|| NO_LINK.to_string());
        let article_id = raw
            .article_id
            .or_else(|| (!article.id.is_empty()).then_some(article.id));

        Self {
            id: raw.id,
            article_id,
            title,
            summary,
            image_url: non_empty(raw.image_url).or_else(|| non_empty(article.image_url)),
            source_url,
            keywords: raw.keywords,
            published_at: raw.published_at.or(article.published_at),
            user_vote: raw.user_vote,
            upvotes: raw.upvotes,
            downvotes: raw.downvotes,
            comment_count: raw.comment_count,
        }
    }
}

/// Django REST Framework page envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    /// Missing on malformed responses; callers treat `None` as a failure.
    #[serde(default)]
    pub results: Option<Vec<T>>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
}

/// Saved article. The service nests the article inside each entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bookmark {
    pub article: Option<Article>,
    #[serde(deserialize_with = "de::opt_id", skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
}

impl Bookmark {
    /// Article id, from the nested article when present.
    pub fn article_id(&self) -> Option<&str> {
        self.article
            .as_ref()
            .map(|a| a.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.article_id.as_deref())
    }

    pub fn title(&self) -> &str {
        self.article
            .as_ref()
            .and_then(|a| a.title.as_deref())
            .unwrap_or(UNTITLED)
    }
}

/// Bookmarks come back either bare or wrapped in `{items: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BookmarkList {
    Wrapped { items: Vec<Bookmark> },
    Bare(Vec<Bookmark>),
}

impl BookmarkList {
    pub(crate) fn into_vec(self) -> Vec<Bookmark> {
        match self {
            BookmarkList::Wrapped { items } | BookmarkList::Bare(items) => items,
        }
    }
}

/// A list endpoint that may or may not be paginated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged { results } | Listing::Bare(results) => results,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHistoryEntry {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub query: String,
    pub searched_at: Option<String>,
}

/// `{favorite_keywords: [...]}` from the keyword endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FavoriteKeywords {
    #[serde(default, deserialize_with = "de::strings")]
    pub favorite_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(deserialize_with = "de::opt_id")]
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub content: String,
    pub created_at: Option<String>,
}

/// Access/refresh pair from the token endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Result of recording a vote on a summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteOutcome {
    #[serde(deserialize_with = "de::id")]
    pub summary_id: String,
    #[serde(default, deserialize_with = "de::count")]
    pub upvotes: i64,
    #[serde(default, deserialize_with = "de::count")]
    pub downvotes: i64,
    pub user_vote: Option<bool>,
}

/// Admin dashboard payload, displayed as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub system_stats: Value,
    pub source_stats: Value,
}
