//! Admin command handlers.

use anyhow::{Context, Result};
use digest_core::Session;
use digest_core::api::{AdminResource, CrawlSource};
use digest_core::store::admin::AdminPage;
use serde_json::Value;

use super::{format_timestamp, table};
use crate::cli::localized;

/// Columns shown for each table, in order.
fn columns(resource: AdminResource) -> &'static [&'static str] {
    match resource {
        AdminResource::Users => &["id", "username", "email", "is_active", "created_at"],
        AdminResource::Articles => &["id", "title", "source_name", "published_at"],
        AdminResource::Summaries => &["id", "article_title", "upvotes", "downvotes"],
        AdminResource::Comments => &["id", "content", "username", "article_title", "created_at"],
        AdminResource::FavWords => &["keyword", "user_count"],
    }
}

const KEYWORD_USER_COLUMNS: &[&str] = &["id", "username", "email", "is_active", "created_at"];

pub async fn stats(session: &Session) -> Result<()> {
    let stats = session
        .load_dashboard()
        .await
        .map_err(|e| localized(session, e))?;

    println!("System");
    print_stats(&stats.system_stats);
    println!();
    println!("Sources");
    print_stats(&stats.source_stats);
    Ok(())
}

fn print_stats(value: &Value) {
    match value {
        Value::Object(map) => {
            let mut out = table(["Metric", "Value"]);
            for (key, value) in map {
                out.add_row(vec![key.clone(), cell(key, value)]);
            }
            println!("{out}");
        }
        Value::Null => println!("(none)"),
        other => println!("{other}"),
    }
}

pub async fn list(
    session: &Session,
    resource: AdminResource,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<()> {
    let loaded = session
        .load_admin_table(resource, page, page_size)
        .await
        .map_err(|e| localized(session, e))?;
    print_page(&loaded, columns(resource));
    Ok(())
}

pub async fn delete(session: &Session, resource: AdminResource, id: &str) -> Result<()> {
    let loaded = session
        .delete_admin_row(resource, id)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Deleted {resource} {id}");
    print_page(&loaded, columns(resource));
    Ok(())
}

pub async fn set_active(session: &Session, user_id: &str, active: bool) -> Result<()> {
    let user = session
        .set_user_active(user_id, active)
        .await
        .map_err(|e| localized(session, e))?;
    let name = if user.username.is_empty() {
        user_id
    } else {
        user.username.as_str()
    };
    if active {
        println!("✓ Unlocked {name}");
    } else {
        println!("✓ Locked {name}");
    }
    Ok(())
}

pub async fn crawl(session: &Session, source: CrawlSource) -> Result<()> {
    let response = session
        .crawl(source)
        .await
        .map_err(|e| localized(session, e))?;
    println!("✓ Crawl of {} started", source.as_str());
    print_response(&response)
}

pub async fn summarize(session: &Session, article_id: Option<&str>) -> Result<()> {
    let response = session
        .summarize(article_id)
        .await
        .map_err(|e| localized(session, e))?;
    match article_id {
        Some(id) => println!("✓ Summarization of article {id} started"),
        None => println!("✓ Bulk summarization started"),
    }
    print_response(&response)
}

pub async fn keyword_users(session: &Session, keyword: &str, page: u32) -> Result<()> {
    let loaded = session
        .load_keyword_users(keyword, page)
        .await
        .map_err(|e| localized(session, e))?;
    println!("Users following \"{keyword}\"");
    print_page(&loaded, KEYWORD_USER_COLUMNS);
    Ok(())
}

fn print_response(response: &Value) -> Result<()> {
    match response {
        Value::Null => {}
        Value::Object(map) if map.is_empty() => {}
        other => {
            let text = serde_json::to_string_pretty(other).context("format response")?;
            println!("{text}");
        }
    }
    Ok(())
}

fn print_page(loaded: &AdminPage, columns: &[&str]) {
    let pagination = loaded.pagination;
    if loaded.rows.is_empty() {
        println!("No rows.");
    } else {
        let mut out = table(columns.iter().copied());
        for row in &loaded.rows {
            out.add_row(
                columns
                    .iter()
                    .map(|column| row.get(*column).map_or_else(String::new, |v| cell(column, v)))
                    .collect::<Vec<_>>(),
            );
        }
        println!("{out}");
    }
    println!(
        "Page {}/{} ({} rows, {} per page)",
        pagination.current,
        pagination.max_page(),
        pagination.total,
        pagination.page_size
    );
}

fn cell(column: &str, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if column.ends_with("_at") => format_timestamp(Some(s.as_str())),
        Value::String(s) => s.clone(),
        Value::Bool(true) if column == "is_active" => "active".to_string(),
        Value::Bool(false) if column == "is_active" => "locked".to_string(),
        other => other.to_string(),
    }
}
