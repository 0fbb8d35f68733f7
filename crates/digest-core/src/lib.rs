//! Core digest library (config, session credentials, REST client, state slices).

pub mod api;
pub mod config;
pub mod credentials;
pub mod messages;
pub mod models;
pub mod session;
pub mod store;

pub use api::{ApiClient, ApiError, ApiResult, SessionEvent};
pub use config::Config;
pub use session::Session;
