//! Feed and vote command handlers.

use anyhow::Result;
use digest_core::Session;
use digest_core::models::FeedItem;
use digest_core::store::feed::{FeedMode, FeedState};
use tracing::warn;

use super::{format_timestamp, table};
use crate::cli::localized;

pub struct FeedOptions<'a> {
    pub trending: bool,
    pub search: Option<&'a str>,
    pub pages: u32,
    pub long: bool,
}

pub async fn show(session: &Session, opts: FeedOptions<'_>) -> Result<()> {
    let mode = if opts.trending {
        FeedMode::Trending
    } else {
        FeedMode::Recommended
    };
    let query = opts.search.map(str::trim).filter(|q| !q.is_empty());

    let mut state = session
        .fetch_feed(mode, query, 1)
        .await
        .map_err(|e| localized(session, e))?;
    for _ in 1..opts.pages.max(1) {
        match session
            .load_more(mode, query)
            .await
            .map_err(|e| localized(session, e))?
        {
            Some(next) => state = next,
            None => break,
        }
    }

    if let Some(query) = query
        && session.api().credentials().is_logged_in()
        && let Err(err) = session.add_history(query).await
    {
        warn!(error = %err, "Failed to record search");
    }

    print_feed(&state, opts.long);
    Ok(())
}

fn print_feed(state: &FeedState, long: bool) {
    if state.items.is_empty() {
        println!("No summaries found.");
        return;
    }

    if long {
        for item in &state.items {
            println!("{}  [{}]", item.title, item.id);
            println!("{}", item.summary);
            println!("{}  {}", votes_cell(item), item.source_url);
            println!();
        }
    } else {
        let mut out = table(["ID", "Title", "Votes", "Comments", "Published"]);
        for item in &state.items {
            out.add_row(vec![
                item.id.clone(),
                item.title.clone(),
                votes_cell(item),
                item.comment_count.to_string(),
                format_timestamp(item.published_at.as_deref()),
            ]);
        }
        println!("{out}");
    }

    let more = if state.has_more {
        " (more available, use --pages)"
    } else {
        ""
    };
    println!(
        "Showing {} of {} summaries{more}",
        state.items.len(),
        state.total_count
    );
}

/// `▲3 ▼1`, with the user's own vote marked.
fn votes_cell(item: &FeedItem) -> String {
    let up = if item.user_vote == Some(true) { "*" } else { "" };
    let down = if item.user_vote == Some(false) { "*" } else { "" };
    format!("▲{}{up} ▼{}{down}", item.upvotes, item.downvotes)
}

pub async fn vote(session: &Session, summary_id: &str, is_upvote: bool) -> Result<()> {
    let tally = session
        .vote(summary_id, is_upvote)
        .await
        .map_err(|e| localized(session, e))?;

    let yours = match tally.user_vote {
        Some(true) => "up",
        Some(false) => "down",
        None => "none",
    };
    println!(
        "✓ Voted on {summary_id}: ▲{} ▼{} (your vote: {yours})",
        tally.upvotes, tally.downvotes
    );
    Ok(())
}
