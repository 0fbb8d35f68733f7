//! Vote bookkeeping for summaries.
//!
//! [`VoteTally::apply`] mirrors the service's counting rules so a vote can be
//! shown before the server confirms it. [`VoteCache`] remembers the user's
//! votes between runs in `votes.json`; feeds that come back without
//! `user_vote` are filled in from it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::paths;
use crate::models::{FeedItem, VoteOutcome};

/// The vote-related fields of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub user_vote: Option<bool>,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn of(item: &FeedItem) -> Self {
        Self {
            user_vote: item.user_vote,
            upvotes: item.upvotes,
            downvotes: item.downvotes,
        }
    }

    /// Tally after the user votes `is_upvote`.
    ///
    /// A first vote adds one to its side, switching moves one count across,
    /// and repeating the current vote changes nothing.
    #[must_use]
    pub fn apply(self, is_upvote: bool) -> Self {
        if self.user_vote == Some(is_upvote) {
            return self;
        }

        let mut next = self;
        match self.user_vote {
            Some(true) => next.upvotes = (next.upvotes - 1).max(0),
            Some(false) => next.downvotes = (next.downvotes - 1).max(0),
            None => {}
        }
        if is_upvote {
            next.upvotes += 1;
        } else {
            next.downvotes += 1;
        }
        next.user_vote = Some(is_upvote);
        next
    }

    pub fn write_to(self, item: &mut FeedItem) {
        item.user_vote = self.user_vote;
        item.upvotes = self.upvotes;
        item.downvotes = self.downvotes;
    }
}

impl From<&VoteOutcome> for VoteTally {
    fn from(outcome: &VoteOutcome) -> Self {
        Self {
            user_vote: outcome.user_vote,
            upvotes: outcome.upvotes,
            downvotes: outcome.downvotes,
        }
    }
}

/// The user's votes by summary id.
#[derive(Debug, Default)]
pub struct VoteCache {
    path: Option<PathBuf>,
    votes: BTreeMap<String, bool>,
}

impl VoteCache {
    /// Loads the default vote cache.
    pub fn open_default() -> Self {
        Self::open(paths::votes_path())
    }

    /// Loads a vote cache. A missing or unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let votes = match read_votes(&path) {
            Ok(votes) => votes,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Ignoring vote cache");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            votes,
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, summary_id: &str) -> Option<bool> {
        self.votes.get(summary_id).copied()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Records (or with `None`, forgets) a vote and writes the cache.
    ///
    /// # Errors
    /// Returns an error if the cache file cannot be written.
    pub fn record(&mut self, summary_id: &str, vote: Option<bool>) -> Result<()> {
        match vote {
            Some(vote) => {
                self.votes.insert(summary_id.to_string(), vote);
            }
            None => {
                self.votes.remove(summary_id);
            }
        }
        self.save()
    }

    /// Fills in `user_vote` where the service left it out.
    pub fn apply_to(&self, item: &mut FeedItem) {
        if item.user_vote.is_none() {
            item.user_vote = self.get(&item.id);
        }
    }

    /// Forgets every vote (on logout).
    ///
    /// # Errors
    /// Returns an error if the cache file cannot be removed.
    pub fn clear(&mut self) -> Result<()> {
        self.votes.clear();
        if let Some(path) = &self.path
            && path.exists()
        {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(&self.votes)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to rename {} to {}", tmp_path.display(), path.display()))
    }
}

fn read_votes(path: &Path) -> Result<BTreeMap<String, bool>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::models::Summary;

    fn tally(user_vote: Option<bool>, upvotes: i64, downvotes: i64) -> VoteTally {
        VoteTally {
            user_vote,
            upvotes,
            downvotes,
        }
    }

    #[test]
    fn test_first_vote_increments_one_side() {
        assert_eq!(tally(None, 3, 1).apply(true), tally(Some(true), 4, 1));
        assert_eq!(tally(None, 3, 1).apply(false), tally(Some(false), 3, 2));
    }

    /// Test: switching sides moves a count across; repeating is a no-op.
    #[test]
    fn test_switch_and_repeat() {
        assert_eq!(tally(Some(true), 4, 1).apply(false), tally(Some(false), 3, 2));
        assert_eq!(tally(Some(false), 3, 2).apply(false), tally(Some(false), 3, 2));
        // Stale counts never go negative.
        assert_eq!(tally(Some(true), 0, 0).apply(false), tally(Some(false), 0, 1));
    }

    #[test]
    fn test_cache_persists_and_fills_missing_votes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("votes.json");

        let mut cache = VoteCache::open(path.clone());
        assert!(cache.is_empty());
        cache.record("s1", Some(true)).unwrap();
        cache.record("s2", Some(false)).unwrap();
        cache.record("s2", None).unwrap();

        let reopened = VoteCache::open(path);
        assert_eq!(reopened.len(), 1);

        let mut missing = FeedItem::from(Summary {
            id: "s1".to_string(),
            ..Summary::default()
        });
        reopened.apply_to(&mut missing);
        assert_eq!(missing.user_vote, Some(true));

        let mut known = FeedItem::from(Summary {
            id: "s1".to_string(),
            user_vote: Some(false),
            ..Summary::default()
        });
        reopened.apply_to(&mut known);
        assert_eq!(known.user_vote, Some(false));
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("votes.json");
        fs::write(&path, "{not json").unwrap();

        let mut cache = VoteCache::open(path.clone());
        assert!(cache.is_empty());
        cache.record("s1", Some(true)).unwrap();
        cache.clear().unwrap();
        assert!(!path.exists());
    }
}
