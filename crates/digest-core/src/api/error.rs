use std::fmt;

use crate::messages::{self, Locale};

/// Error from a call to the news service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-success status (other than an unrecovered 401).
    #[error("HTTP {status}: {}", summarize(.body))]
    Http { status: u16, body: String },

    /// 401 that the refresh flow did not (or may not) recover, e.g. bad login.
    #[error("Unauthorized: {}", summarize(.body))]
    Unauthorized { body: String },

    /// The refresh token was missing or rejected; the session was cleared.
    #[error("Session expired, log in again")]
    SessionExpired,

    /// Connection failure, timeout, or an unreadable body.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The body parsed but lacks the fields the caller needs.
    #[error("Invalid API response structure: {0}")]
    InvalidResponse(String),

    /// The client declined to send the request.
    #[error("{0}")]
    Refused(String),

    /// Locking a staff account was declined before any request.
    #[error("Refusing to lock staff account {0}")]
    StaffAccount(String),

    /// Persisting session state failed.
    #[error("Failed to store session: {0:#}")]
    Storage(anyhow::Error),
}

impl ApiError {
    /// HTTP status when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Localized sentence for the user, resolved through the error-code table.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            ApiError::Http { body, .. } | ApiError::Unauthorized { body } => {
                messages::describe_error_text(body, locale)
            }
            ApiError::SessionExpired => locale.session_expired().to_string(),
            ApiError::Transport(_) => locale.network_error().to_string(),
            ApiError::Refused(reason) => reason.clone(),
            ApiError::StaffAccount(username) => locale.staff_lock_refused(username),
            ApiError::Decode(_) | ApiError::InvalidResponse(_) | ApiError::Storage(_) => {
                locale.generic_error().to_string()
            }
        }
    }
}

/// First line of a response body, clipped for log and error output.
fn summarize(body: &str) -> impl fmt::Display + '_ {
    const MAX: usize = 200;
    let line = body.lines().next().unwrap_or("").trim();
    let end = line
        .char_indices()
        .nth(MAX)
        .map_or(line.len(), |(idx, _)| idx);
    &line[..end]
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
