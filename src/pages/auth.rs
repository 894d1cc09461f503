//! Login and signup forms.

use tracing::warn;

use crate::routes::Route;
use crate::session::Session;

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPage {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigates home on success; any failure shows one generic message.
    pub async fn submit(&mut self, session: &Session) -> Option<Route> {
        self.error = None;
        match session.login(&self.username, &self.password).await {
            Ok(_) => Some(Route::Home),
            Err(e) => {
                warn!("Login failed for '{}': {}", self.username, e);
                self.error = Some(INVALID_CREDENTIALS.to_string());
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupPage {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub error: Option<String>,
}

impl SignupPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the backend's own explanation when it sent one.
    pub async fn submit(&mut self, session: &Session) -> Option<Route> {
        self.error = None;
        let result = session
            .signup(
                &self.username,
                &self.email,
                &self.password,
                &self.confirm_password,
            )
            .await;
        match result {
            Ok(_) => Some(Route::Home),
            Err(e) => {
                warn!("Signup failed for '{}': {}", self.username, e);
                let message = e.detail().unwrap_or(REGISTRATION_FAILED);
                self.error = Some(message.to_string());
                None
            }
        }
    }
}
