use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::client::{ApiClient, ApiRequest, LOGIN_PATH, LogoutReason, SessionEvent};
use super::error::{ApiError, ApiResult};
use crate::credentials::Credentials;
use crate::models::{TokenPair, User};

/// New account form.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Completes a reset started with [`ApiClient::request_password_reset`].
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub reset_token: String,
    pub password: String,
    pub password2: String,
}

impl ApiClient {
    /// Exchanges username and password for tokens and stores the session.
    ///
    /// # Errors
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Credentials> {
        let request = ApiRequest::post(LOGIN_PATH)
            .json(json!({ "username": username, "password": password }));
        let pair: TokenPair = self.json(&request).await?;

        let creds = Credentials {
            access: pair.access,
            refresh: pair.refresh,
            user: pair.user,
        };
        self.credentials()
            .set(creds.clone())
            .map_err(ApiError::Storage)?;

        let username = creds.user.as_ref().map(|u| u.username.clone());
        info!(user = username.as_deref().unwrap_or("?"), "Logged in");
        self.publish(SessionEvent::LoggedIn { username });
        Ok(creds)
    }

    /// Drops the stored session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the credentials file cannot be removed.
    pub fn logout(&self) -> ApiResult<bool> {
        let had = self.credentials().clear().map_err(ApiError::Storage)?;
        if had {
            info!("Logged out");
            self.publish(SessionEvent::LoggedOut {
                reason: LogoutReason::Requested,
            });
        }
        Ok(had)
    }

    /// # Errors
    /// Returns the service's validation errors as [`ApiError::Http`].
    pub async fn register(&self, form: &Registration) -> ApiResult<Value> {
        let body = serde_json::to_value(form)?;
        self.json(&ApiRequest::post("/user/register").json(body))
            .await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn profile(&self) -> ApiResult<User> {
        self.json(&ApiRequest::get("/user/profile/")).await
    }

    /// # Errors
    /// Returns an error if the request fails or the old password is wrong.
    pub async fn change_password(&self, change: &PasswordChange) -> ApiResult<()> {
        let body = serde_json::to_value(change)?;
        self.empty(&ApiRequest::post("/user/change-password/").json(body))
            .await
    }

    /// Asks the service to email a reset link.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<Value> {
        self.json(
            &ApiRequest::post("/user/request-password-reset/").json(json!({ "email": email })),
        )
        .await
    }

    /// # Errors
    /// Returns an error if the token is invalid or the passwords are rejected.
    pub async fn confirm_password_reset(&self, confirm: &PasswordResetConfirm) -> ApiResult<Value> {
        let body = serde_json::to_value(confirm)?;
        self.json(&ApiRequest::post("/user/password-reset-confirm/").json(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::CredentialStore;

    #[tokio::test]
    async fn test_login_stores_tokens_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({ "username": "lan", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "a1",
                "refresh": "r1",
                "user": { "id": 3, "username": "lan", "email": "lan@example.com", "is_staff": true }
            })))
            .mount(&server)
            .await;

        let store = Arc::new(CredentialStore::in_memory(None));
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5), Arc::clone(&store)).unwrap();
        let mut events = api.subscribe();

        let creds = api.login("lan", "pw").await.unwrap();
        assert_eq!(creds.access, "a1");
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        let user = store.user().unwrap();
        assert_eq!(user.id, "3");
        assert!(user.is_staff);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedIn {
                username: Some("lan".to_string())
            }
        );

        assert!(api.logout().unwrap());
        assert!(!api.logout().unwrap());
        assert!(!store.is_logged_in());
    }
}
