//! REST API client module for the Moneta backend.
//!
//! This module provides the `ApiClient` for calling the backend with
//! `get`/`post`/`put`/`delete`, and the `ApiError` taxonomy callers branch on.
//!
//! Protected endpoints use bearer token authentication; the token is read
//! from the shared `SessionStore` on every call and the session is cleared
//! when the backend answers 401.

pub mod client;
pub mod error;

pub use client::{is_public_endpoint, ApiClient, NO_BODY};
pub use error::ApiError;
