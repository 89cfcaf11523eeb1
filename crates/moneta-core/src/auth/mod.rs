//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionStore`: persisted bearer token and cached user profile
//! - `Authenticator`: login, logout and profile loading on top of the API client
//! - `CredentialStore`: optional OS keychain storage for remembered passwords
//!
//! Sessions never expire locally; a stale token is only discovered when the
//! backend answers 401.

pub mod authenticator;
pub mod credentials;
pub mod session;

pub use authenticator::{AuthError, Authenticator};
pub use credentials::CredentialStore;
pub use session::{Session, SessionStore};
