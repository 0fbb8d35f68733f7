//! CLI command handlers.

pub mod admin;
pub mod auth;
pub mod bookmarks;
pub mod comments;
pub mod config;
pub mod feed;
pub mod history;
pub mod keywords;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use digest_core::models::parse_timestamp;
use digest_core::{ApiError, Session};

/// An API error with its localized text, led by the message a slice
/// recorded for a failed add/remove.
pub(crate) fn action_error(
    session: &Session,
    err: ApiError,
    recorded: Option<String>,
) -> anyhow::Error {
    let reason = session.describe(&err);
    match recorded {
        Some(recorded) if !err.is_session_expired() && recorded != reason => {
            anyhow::Error::new(err).context(format!("{recorded} {reason}"))
        }
        _ => anyhow::Error::new(err).context(reason),
    }
}

/// A table sized to the terminal.
pub(crate) fn table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// `2024-05-01 08:30` in local time, or the raw value if it doesn't parse.
pub(crate) fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    parse_timestamp(raw).map_or_else(
        || raw.to_string(),
        |ts| {
            ts.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

/// Reads one line from stdin after printing `prompt`.
pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Uses `given` when present, otherwise prompts for it.
pub(crate) fn password_or_prompt(given: Option<String>, prompt: &str) -> Result<String> {
    match given {
        Some(password) => Ok(password),
        None => {
            let password = prompt_line(prompt)?;
            if password.is_empty() {
                anyhow::bail!("Password must not be empty");
            }
            Ok(password)
        }
    }
}
