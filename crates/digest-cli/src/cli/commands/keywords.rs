//! Favorite keyword command handlers.

use anyhow::Result;
use digest_core::Session;

use super::action_error;
use crate::cli::localized;

pub async fn list(session: &Session) -> Result<()> {
    let keywords = session
        .fetch_keywords()
        .await
        .map_err(|e| localized(session, e))?;
    print_keywords(&keywords);
    Ok(())
}

pub async fn add(session: &Session, keyword: &str) -> Result<()> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        anyhow::bail!("Keyword must not be empty");
    }

    let keywords = session.add_keyword(keyword).await.map_err(|e| {
        action_error(session, e, session.user_state().favorite_keywords.error)
    })?;
    println!("✓ Added \"{keyword}\"");
    print_keywords(&keywords);
    Ok(())
}

pub async fn remove(session: &Session, keyword: &str) -> Result<()> {
    let keywords = session.remove_keyword(keyword).await.map_err(|e| {
        action_error(session, e, session.user_state().favorite_keywords.error)
    })?;
    println!("✓ Removed \"{keyword}\"");
    print_keywords(&keywords);
    Ok(())
}

fn print_keywords(keywords: &[String]) {
    if keywords.is_empty() {
        println!("No favorite keywords.");
    } else {
        for keyword in keywords {
            println!("{keyword}");
        }
    }
}
