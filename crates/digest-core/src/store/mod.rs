//! Client-side state slices.
//!
//! Each slice is plain data plus the transitions applied when a request
//! starts, succeeds or fails. Slices never perform I/O themselves; the
//! [`crate::session::Session`] facade sequences the calls.

use serde::Serialize;

pub mod admin;
pub mod feed;
pub mod user;
pub mod votes;

/// Lifecycle of an async load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// A list with its load status and last error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub status: LoadStatus,
    pub error: Option<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: LoadStatus::Idle,
            error: None,
        }
    }
}

impl<T> Collection<T> {
    pub fn pending(&mut self) {
        self.status = LoadStatus::Loading;
    }

    pub fn fulfilled(&mut self, items: Vec<T>) {
        self.items = items;
        self.status = LoadStatus::Succeeded;
        self.error = None;
    }

    /// Records a failure; existing items are kept.
    pub fn rejected(&mut self, error: impl Into<String>) {
        self.status = LoadStatus::Failed;
        self.error = Some(error.into());
    }

    /// Takes the list returned by a successful add/remove.
    pub fn updated(&mut self, items: Vec<T>) {
        self.items = items;
        self.error = None;
    }

    /// Records a failed add/remove without touching the load status.
    pub fn action_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }
}
