use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `data` of a successful `/login` response.
///
/// `user` is kept as raw JSON so the cached copy is exactly what the server
/// sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginData {
    pub token: String,
    pub user: serde_json::Value,
}

/// User ids arrive as numbers from `/usuario` and as strings from older
/// cached profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// User record as returned by `GET /usuario` or cached at login.
///
/// The backend uses Portuguese field names; the cached login user may use the
/// English ones, or carry both. The first non-empty value wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUserProfile")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub id: Option<UserId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub registered_at: Option<String>,
    pub profile_image: Option<String>,
}

/// Wire shape of [`UserProfile`], one field per spelling.
#[derive(Deserialize)]
struct RawUserProfile {
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nome: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    registered_at: Option<String>,
    #[serde(default, rename = "registeredAt")]
    registered_at_camel: Option<String>,
    #[serde(default)]
    data_cadastro: Option<String>,
    #[serde(default)]
    profile_image: Option<String>,
    #[serde(default, rename = "profileImage")]
    profile_image_camel: Option<String>,
    #[serde(default)]
    imagem_perfil_url: Option<String>,
}

fn first_non_empty<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values.into_iter().flatten().find(|v| !v.is_empty())
}

impl From<RawUserProfile> for UserProfile {
    fn from(raw: RawUserProfile) -> Self {
        Self {
            id: raw.id,
            name: first_non_empty([raw.name, raw.nome]),
            email: raw.email,
            registered_at: first_non_empty([
                raw.registered_at,
                raw.registered_at_camel,
                raw.data_cadastro,
            ]),
            profile_image: first_non_empty([
                raw.profile_image,
                raw.profile_image_camel,
                raw.imagem_perfil_url,
            ]),
        }
    }
}

/// Display view of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AppUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.is_empty())
}

impl AppUser {
    /// Build the view from the cached login user only.
    pub fn from_cached(cached: &UserProfile) -> Self {
        Self {
            id: cached.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            name: cached.name.clone().unwrap_or_default(),
            email: cached.email.clone().unwrap_or_default(),
            registered_at: None,
            profile_image: None,
        }
    }

    /// Overlay a fresh server profile on the cached user. Server values win
    /// when present; registration date and image come only from the server.
    pub fn merge(server: &UserProfile, cached: &UserProfile) -> Self {
        let base = Self::from_cached(cached);
        Self {
            id: server.id.as_ref().map(ToString::to_string).unwrap_or(base.id),
            name: non_empty(server.name.as_ref()).cloned().unwrap_or(base.name),
            email: non_empty(server.email.as_ref()).cloned().unwrap_or(base.email),
            registered_at: server.registered_at.clone(),
            profile_image: server.profile_image.clone(),
        }
    }

    /// Registration day, if the backend sent a parseable date or timestamp.
    pub fn registered_on(&self) -> Option<NaiveDate> {
        let raw = self.registered_at.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}
