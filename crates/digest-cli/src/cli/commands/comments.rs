//! Comment command handlers.

use anyhow::Result;
use digest_core::Session;

use super::{format_timestamp, table};
use crate::cli::localized;

pub async fn list(session: &Session, summary_id: &str) -> Result<()> {
    let comments = session
        .api()
        .comments(summary_id)
        .await
        .map_err(|e| localized(session, e))?;

    if comments.is_empty() {
        println!("No comments yet.");
        return Ok(());
    }

    let mut out = table(["ID", "User", "Comment", "Posted"]);
    for comment in &comments {
        out.add_row(vec![
            comment.id.clone(),
            comment.username.clone().unwrap_or_default(),
            comment.content.clone(),
            format_timestamp(comment.created_at.as_deref()),
        ]);
    }
    println!("{out}");
    Ok(())
}

pub async fn add(session: &Session, summary_id: &str, content: &str) -> Result<()> {
    let content = content.trim();
    if content.is_empty() {
        anyhow::bail!("Comment must not be empty");
    }

    let comment = session
        .api()
        .add_comment(summary_id, content)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Posted comment {}", comment.id);
    Ok(())
}

pub async fn delete(session: &Session, comment_id: &str) -> Result<()> {
    session
        .api()
        .delete_comment(comment_id)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Deleted comment {comment_id}");
    Ok(())
}
