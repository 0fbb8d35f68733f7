//! Search history command handlers.

use anyhow::Result;
use digest_core::Session;
use digest_core::models::SearchHistoryEntry;

use super::{action_error, format_timestamp, table};
use crate::cli::localized;

pub async fn list(session: &Session) -> Result<()> {
    let entries = session
        .fetch_history()
        .await
        .map_err(|e| localized(session, e))?;
    print_history(&entries);
    Ok(())
}

pub async fn add(session: &Session, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Search query must not be empty");
    }

    let entries = session
        .add_history(query)
        .await
        .map_err(|e| action_error(session, e, session.user_state().search_history.error))?;
    println!("✓ Saved search \"{query}\"");
    print_history(&entries);
    Ok(())
}

pub async fn remove(session: &Session, query: &str) -> Result<()> {
    let entries = session
        .remove_history(query)
        .await
        .map_err(|e| action_error(session, e, session.user_state().search_history.error))?;
    println!("✓ Removed search \"{query}\"");
    print_history(&entries);
    Ok(())
}

fn print_history(entries: &[SearchHistoryEntry]) {
    if entries.is_empty() {
        println!("No recent searches.");
        return;
    }

    let mut out = table(["Query", "Searched"]);
    for entry in entries {
        out.add_row(vec![
            entry.query.clone(),
            format_timestamp(entry.searched_at.as_deref()),
        ]);
    }
    println!("{out}");
}
