//! Moneta core - client-side plumbing for the Moneta personal-finance API.
//!
//! The backend owns every piece of business logic (balances, goals,
//! gamification). This crate provides what a front-end needs to talk to it:
//!
//! - [`api::ApiClient`]: JSON-over-REST client with bearer-token injection,
//!   primary/fallback host selection and session invalidation on 401
//! - [`auth::SessionStore`]: persisted token and cached user profile
//! - [`auth::Authenticator`]: login/logout flow built on the two above
//! - [`config::Config`]: on-disk and environment configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{Authenticator, AuthError, Session, SessionStore};
pub use config::{ApiConfig, Config};
