//! Bookmark command handlers.

use anyhow::Result;
use digest_core::Session;
use digest_core::models::Bookmark;

use super::{action_error, format_timestamp, table};
use crate::cli::localized;

pub async fn list(session: &Session) -> Result<()> {
    let bookmarks = session
        .fetch_bookmarks()
        .await
        .map_err(|e| localized(session, e))?;
    print_bookmarks(&bookmarks);
    Ok(())
}

pub async fn add(session: &Session, article_id: &str) -> Result<()> {
    let bookmarks = session
        .add_bookmark(article_id)
        .await
        .map_err(|e| action_error(session, e, session.user_state().bookmarks.error))?;
    println!("✓ Saved article {article_id}");
    print_bookmarks(&bookmarks);
    Ok(())
}

pub async fn remove(session: &Session, article_id: &str) -> Result<()> {
    let bookmarks = session
        .remove_bookmark(article_id)
        .await
        .map_err(|e| action_error(session, e, session.user_state().bookmarks.error))?;
    println!("✓ Removed article {article_id}");
    print_bookmarks(&bookmarks);
    Ok(())
}

pub async fn toggle(session: &Session, article_id: &str) -> Result<()> {
    let saved = session
        .toggle_bookmark(article_id)
        .await
        .map_err(|e| action_error(session, e, session.user_state().bookmarks.error))?;
    if saved {
        println!("✓ Saved article {article_id}");
    } else {
        println!("✓ Removed article {article_id}");
    }
    Ok(())
}

fn print_bookmarks(bookmarks: &[Bookmark]) {
    if bookmarks.is_empty() {
        println!("No saved articles.");
        return;
    }

    let mut out = table(["Article", "Title", "Published", "Link"]);
    for bookmark in bookmarks {
        let article = bookmark.article.as_ref();
        out.add_row(vec![
            bookmark.article_id().unwrap_or_default().to_string(),
            bookmark.title().to_string(),
            format_timestamp(article.and_then(|a| a.published_at.as_deref())),
            article
                .and_then(|a| a.url.clone())
                .unwrap_or_default(),
        ]);
    }
    println!("{out}");
}
