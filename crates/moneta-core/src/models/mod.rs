//! Wire models shared with the Moneta backend.
//!
//! The backend owns every domain record (transactions, cards, goals, fixed
//! expenses); callers declare those shapes themselves when calling the client.
//! This module only holds what the client core needs:
//!
//! - `ApiResponse`: the `{ success, message?, data? }` envelope
//! - `LoginRequest`, `LoginData`, `RegisterRequest`: the `/login` and `/register` exchanges
//! - `UserProfile`, `AppUser`: the user record and its display view

pub mod envelope;
pub mod user;

pub use envelope::ApiResponse;
pub use user::{AppUser, LoginData, LoginRequest, RegisterRequest, UserId, UserProfile};
