//! Login flow on top of [`ApiClient`] and [`SessionStore`].

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, NO_BODY};
use crate::models::{ApiResponse, AppUser, LoginData, LoginRequest, RegisterRequest, UserProfile};

use super::SessionStore;

const LOGIN_ENDPOINT: &str = "/login";
const LOGOUT_ENDPOINT: &str = "/logout";
const REGISTER_ENDPOINT: &str = "/register";
const PROFILE_ENDPOINT: &str = "/usuario";

const DEFAULT_LOGIN_ERROR: &str = "Login failed";
const DEFAULT_REGISTER_ERROR: &str = "Registration failed";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend answered with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local session storage failed.
    #[error(transparent)]
    Session(#[from] anyhow::Error),
}

#[derive(Clone, Debug)]
pub struct Authenticator {
    api: ApiClient,
}

impl Authenticator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Log in and cache the token and user.
    ///
    /// Any previous session is dropped first, and nothing is left behind if
    /// the login fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData, AuthError> {
        self.session().clear()?;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.try_login(&request).await;

        if let Err(ref e) = result {
            debug!(error = %e, "Login failed");
            if let Err(clear_err) = self.session().clear() {
                warn!(error = %clear_err, "Failed to clear session after failed login");
            }
        }
        result
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<LoginData, AuthError> {
        let response: ApiResponse<LoginData> = self.api.post(LOGIN_ENDPOINT, Some(request)).await?;
        if !response.success {
            return Err(AuthError::Rejected(response.message_or(DEFAULT_LOGIN_ERROR)));
        }
        let message = response.message_or(DEFAULT_LOGIN_ERROR);
        let data = response.data.ok_or(AuthError::Rejected(message))?;

        self.session().set(&data.token, &data.user)?;
        info!("Logged in");
        Ok(data)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<String>, AuthError> {
        let response: ApiResponse<serde_json::Value> =
            self.api.post(REGISTER_ENDPOINT, Some(request)).await?;
        if !response.success {
            return Err(AuthError::Rejected(response.message_or(DEFAULT_REGISTER_ERROR)));
        }
        Ok(response.message)
    }

    /// Tell the backend (best effort) and drop the local session.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let has_token = match self.session().token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read token before logout");
                false
            }
        };

        if has_token {
            if let Err(e) = self
                .api
                .post::<serde_json::Value, _>(LOGOUT_ENDPOINT, NO_BODY)
                .await
            {
                debug!(error = %e, status = e.status(), "Logout request failed, clearing local session anyway");
            }
        }

        self.session().clear()?;
        info!("Logged out");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Route guard: fails unless a token and a user are cached.
    pub fn require_auth(&self) -> Result<(), AuthError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(AuthError::NotAuthenticated)
        }
    }

    pub fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.session().token()?)
    }

    pub fn current_user(&self) -> Result<Option<UserProfile>, AuthError> {
        Ok(self.session().current_user_as()?)
    }

    /// The logged-in user, refreshed from `/usuario` when the backend is
    /// reachable. Falls back to the cached copy on any failure except an
    /// expired session, which is returned so the caller can send the user
    /// back to login.
    pub async fn load_user(&self) -> Result<Option<AppUser>, AuthError> {
        let Some(cached) = self.current_user()? else {
            return Ok(None);
        };

        match self.api.get::<ApiResponse<UserProfile>>(PROFILE_ENDPOINT).await {
            Ok(response) => match response.into_data() {
                Some(profile) => Ok(Some(AppUser::merge(&profile, &cached))),
                None => Ok(Some(AppUser::from_cached(&cached))),
            },
            Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired.into()),
            Err(e) => {
                debug!(error = %e, "Profile refresh failed, using cached user");
                Ok(Some(AppUser::from_cached(&cached)))
            }
        }
    }

    /// Wipe all locally stored data, session included.
    pub fn clear_all_data(&self) -> Result<(), AuthError> {
        self.session().clear_all()?;
        Ok(())
    }
}
