//! REST API access.
//!
//! [`ApiClient`] owns the HTTP client, the bearer-token handling and the
//! refresh gate. Endpoint wrappers live in per-area submodules as further
//! `impl ApiClient` blocks.

mod admin;
mod auth;
mod client;
mod error;
mod news;
mod user;

pub use admin::{AdminResource, CrawlSource};
pub use auth::{PasswordChange, PasswordResetConfirm, Registration};
pub use client::{
    ApiClient, ApiRequest, LOGIN_PATH, LogoutReason, REFRESH_PATH, SessionEvent, USER_AGENT,
};
pub use error::{ApiError, ApiResult};
pub use news::{FeedQuery, feed_request};
