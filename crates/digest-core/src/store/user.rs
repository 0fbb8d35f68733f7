//! Per-user lists: favorite keywords, search history and bookmarks.

use serde::Serialize;

use super::Collection;
use crate::models::{Article, Bookmark, SearchHistoryEntry};

pub fn keyword_add_failed(keyword: &str) -> String {
    format!("Không thể thêm từ khóa \"{keyword}\".")
}

pub fn keyword_remove_failed(keyword: &str) -> String {
    format!("Không thể xóa từ khóa \"{keyword}\".")
}

pub fn history_add_failed(query: &str) -> String {
    format!("Không thể lưu tìm kiếm \"{query}\".")
}

pub fn history_remove_failed(query: &str) -> String {
    format!("Không thể xóa tìm kiếm \"{query}\".")
}

pub fn bookmark_add_failed(article_id: &str) -> String {
    format!("Không thể lưu bài viết (ID: {article_id}).")
}

pub fn bookmark_remove_failed(article_id: &str) -> String {
    format!("Không thể xóa bài viết đã lưu (ID: {article_id}).")
}

/// Undo record for an optimistic bookmark toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkToggle {
    /// The article was not saved; a placeholder entry was appended.
    Added { article_id: String },
    /// The article was saved; the entry was taken out of `index`.
    Removed { index: usize, entry: Bookmark },
}

impl BookmarkToggle {
    pub fn article_id(&self) -> &str {
        match self {
            BookmarkToggle::Added { article_id } => article_id,
            BookmarkToggle::Removed { entry, .. } => entry.article_id().unwrap_or_default(),
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, BookmarkToggle::Added { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserState {
    pub favorite_keywords: Collection<String>,
    pub search_history: Collection<SearchHistoryEntry>,
    pub bookmarks: Collection<Bookmark>,
}

impl UserState {
    /// Back to the logged-out state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_bookmarked(&self, article_id: &str) -> bool {
        self.bookmarks
            .items
            .iter()
            .any(|b| b.article_id() == Some(article_id))
    }

    /// Flips membership of `article_id` before the server is asked.
    pub fn toggle_bookmark(&mut self, article_id: &str) -> BookmarkToggle {
        let position = self
            .bookmarks
            .items
            .iter()
            .position(|b| b.article_id() == Some(article_id));

        match position {
            Some(index) => BookmarkToggle::Removed {
                index,
                entry: self.bookmarks.items.remove(index),
            },
            None => {
                self.bookmarks.items.push(Bookmark {
                    article: Some(Article {
                        id: article_id.to_string(),
                        ..Article::default()
                    }),
                    article_id: Some(article_id.to_string()),
                });
                BookmarkToggle::Added {
                    article_id: article_id.to_string(),
                }
            }
        }
    }

    /// Undoes [`UserState::toggle_bookmark`] and records `error`.
    pub fn revert_bookmark(&mut self, toggle: BookmarkToggle, error: String) {
        match toggle {
            BookmarkToggle::Added { article_id } => {
                self.bookmarks
                    .items
                    .retain(|b| b.article_id() != Some(article_id.as_str()));
            }
            BookmarkToggle::Removed { index, entry } => {
                let index = index.min(self.bookmarks.items.len());
                self.bookmarks.items.insert(index, entry);
            }
        }
        self.bookmarks.action_failed(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LoadStatus;

    fn saved(id: &str, title: &str) -> Bookmark {
        Bookmark {
            article: Some(Article {
                id: id.to_string(),
                title: Some(title.to_string()),
                ..Article::default()
            }),
            article_id: None,
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(keyword_add_failed("AI"), "Không thể thêm từ khóa \"AI\".");
        assert_eq!(
            bookmark_remove_failed("a1"),
            "Không thể xóa bài viết đã lưu (ID: a1)."
        );
    }

    /// Test: toggling twice restores the original list and order.
    #[test]
    fn test_toggle_twice_restores_state() {
        let mut state = UserState::default();
        state
            .bookmarks
            .fulfilled(vec![saved("a1", "One"), saved("a2", "Two")]);
        let before = state.clone();

        let first = state.toggle_bookmark("a3");
        assert!(first.is_add());
        assert!(state.is_bookmarked("a3"));
        let second = state.toggle_bookmark("a3");
        assert!(!second.is_add());
        assert_eq!(state, before);

        let removed = state.toggle_bookmark("a1");
        assert_eq!(removed.article_id(), "a1");
        assert!(!state.is_bookmarked("a1"));
        state.toggle_bookmark("a1");
        assert!(state.is_bookmarked("a1"));
    }

    #[test]
    fn test_revert_restores_position_and_records_error() {
        let mut state = UserState::default();
        state
            .bookmarks
            .fulfilled(vec![saved("a1", "One"), saved("a2", "Two")]);
        let before = state.bookmarks.items.clone();

        let toggle = state.toggle_bookmark("a1");
        state.revert_bookmark(toggle, bookmark_remove_failed("a1"));
        assert_eq!(state.bookmarks.items, before);
        assert_eq!(state.bookmarks.status, LoadStatus::Succeeded);
        assert!(state.bookmarks.error.is_some());

        let toggle = state.toggle_bookmark("a9");
        state.revert_bookmark(toggle, bookmark_add_failed("a9"));
        assert_eq!(state.bookmarks.items, before);
        assert_eq!(
            state.bookmarks.error.as_deref(),
            Some("Không thể lưu bài viết (ID: a9).")
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = UserState::default();
        state.favorite_keywords.fulfilled(vec!["AI".to_string()]);
        state.reset();
        assert_eq!(state, UserState::default());
    }
}
