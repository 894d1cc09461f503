use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::api::CineApi;
use crate::error::{ApiError, ApiResult};
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Uninitialized,
    Validating,
    Authenticated(User),
    Anonymous,
}

/// Current user of this client. Passed explicitly to every page controller.
/// The bearer token itself stays in the persistent store behind the API.
pub struct Session {
    api: Arc<dyn CineApi>,
    state: RwLock<AuthState>,
}

impl Session {
    pub fn new(api: Arc<dyn CineApi>) -> Self {
        Self {
            api,
            state: RwLock::new(AuthState::Uninitialized),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        match self.state() {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), AuthState::Authenticated(_))
    }

    fn set(&self, next: AuthState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Startup validation of a persisted token. An invalid token is removed.
    pub async fn init(&self) -> AuthState {
        if !self.api.has_token() {
            self.set(AuthState::Anonymous);
            return AuthState::Anonymous;
        }
        self.set(AuthState::Validating);
        let next = match self.api.current_user().await {
            Ok(user) => {
                info!("Restored session for '{}'", user.username);
                AuthState::Authenticated(user)
            }
            Err(e) => {
                warn!("Stored token rejected, clearing it: {}", e);
                if let Err(e) = self.api.logout() {
                    warn!("Failed to clear stored token: {}", e);
                }
                AuthState::Anonymous
            }
        };
        self.set(next.clone());
        next
    }

    /// Issues a token, then resolves the user with it.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<User> {
        self.api.login(username, password).await?;
        let user = self.api.current_user().await?;
        info!("Logged in as '{}'", user.username);
        self.set(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> ApiResult<User> {
        // Checked locally; nothing is sent.
        if password != confirm_password {
            return Err(ApiError::Validation {
                status: 422,
                detail: "Passwords do not match".to_string(),
            });
        }
        let created = self.api.register(username, email, password).await?;
        debug!("Registered user {} ({})", created.username, created.id);
        self.login(username, password).await
    }

    pub fn logout(&self) {
        if let Err(e) = self.api.logout() {
            warn!("Failed to clear stored token: {}", e);
        }
        self.set(AuthState::Anonymous);
        info!("Logged out");
    }
}
