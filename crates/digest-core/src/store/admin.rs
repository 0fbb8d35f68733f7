//! Admin dashboard state and remembered table pagination.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::api::AdminResource;
use crate::config::paths;
use crate::models::DashboardStats;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing)]
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

impl Pagination {
    /// Number of pages for the current total (at least one).
    pub fn max_page(&self) -> u32 {
        let size = u64::from(self.page_size.max(1));
        let pages = self.total.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    fn is_valid(&self) -> bool {
        self.current > 0 && self.page_size > 0
    }
}

/// One fetched page of an admin table.
#[derive(Debug, Clone)]
pub struct AdminPage {
    pub rows: Vec<Value>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct AdminState {
    pub stats: Option<DashboardStats>,
    pub tables: BTreeMap<AdminResource, Vec<Value>>,
    pub pagination: Pagination,
    pub keyword_users: Vec<Value>,
    pub keyword_users_pagination: Pagination,
    pub selected_keyword: Option<String>,
    pub loading: bool,
}

impl AdminState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn rows(&self, resource: AdminResource) -> &[Value] {
        self.tables.get(&resource).map_or(&[], Vec::as_slice)
    }

    pub fn set_rows(&mut self, resource: AdminResource, rows: Vec<Value>, pagination: Pagination) {
        self.tables.insert(resource, rows);
        self.pagination = pagination;
    }

    pub fn set_keyword_users(&mut self, keyword: &str, rows: Vec<Value>, pagination: Pagination) {
        self.selected_keyword = Some(keyword.to_string());
        self.keyword_users = rows;
        self.keyword_users_pagination = pagination;
    }

    pub fn clear_keyword_users(&mut self) {
        self.selected_keyword = None;
        self.keyword_users.clear();
        self.keyword_users_pagination = Pagination::default();
    }
}

/// Current page and page size of the admin tables, kept between runs.
#[derive(Debug)]
pub struct PaginationMemory {
    path: Option<PathBuf>,
}

impl PaginationMemory {
    pub fn open_default() -> Self {
        Self {
            path: Some(paths::admin_pagination_path()),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Last saved position, or page 1. Invalid files are discarded.
    pub fn load(&self) -> Pagination {
        let Some(path) = &self.path else {
            return Pagination::default();
        };
        let Ok(contents) = fs::read_to_string(path) else {
            return Pagination::default();
        };

        match serde_json::from_str::<Pagination>(&contents) {
            Ok(saved) if saved.is_valid() => saved,
            _ => {
                warn!(path = %path.display(), "Discarding invalid admin pagination");
                let _ = fs::remove_file(path);
                Pagination::default()
            }
        }
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, pagination: Pagination) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string(&pagination)?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_max_page() {
        let mut p = Pagination::default();
        assert_eq!(p.max_page(), 1);
        p.total = 21;
        assert_eq!(p.max_page(), 3);
        p.total = 20;
        assert_eq!(p.max_page(), 2);
    }

    #[test]
    fn test_memory_round_trip_without_total() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("admin_pagination.json");
        let memory = PaginationMemory::at(path.clone());
        assert_eq!(memory.load(), Pagination::default());

        memory
            .save(Pagination {
                current: 4,
                page_size: 20,
                total: 300,
            })
            .unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!({ "current": 4, "page_size": 20 }));

        let loaded = memory.load();
        assert_eq!((loaded.current, loaded.page_size, loaded.total), (4, 20, 0));
    }

    /// Test: a saved page of 0 is discarded and the file removed.
    #[test]
    fn test_invalid_memory_is_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("admin_pagination.json");
        fs::write(&path, r#"{"current":0,"page_size":10}"#).unwrap();

        assert_eq!(PaginationMemory::at(path.clone()).load(), Pagination::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_drops_tables_and_selection() {
        let mut state = AdminState::default();
        state.set_rows(
            AdminResource::Users,
            vec![json!({ "id": 1 })],
            Pagination::default(),
        );
        state.set_keyword_users("AI", vec![json!({ "id": 2 })], Pagination::default());
        assert_eq!(state.rows(AdminResource::Users).len(), 1);
        assert_eq!(state.selected_keyword.as_deref(), Some("AI"));

        state.reset();
        assert!(state.rows(AdminResource::Users).is_empty());
        assert!(state.selected_keyword.is_none());
    }
}
