use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored short link. `short_code` never changes after creation and
/// `clicks` only ever grows.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub clicks: i64,
}

/// One anonymized visit. Only the salted, truncated address digest is ever
/// persisted; the raw client address does not appear anywhere in this type.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VisitorRecord {
    pub id: i64,
    pub hashed_address: String,
    pub user_agent: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Dashboard aggregates, computed on read and never persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub total_urls: i64,
    pub total_clicks: i64,
    pub top_urls: Vec<LinkEntry>,
    pub recent_visitors: Vec<VisitorRecord>,
    pub visitors_today: i64,
    pub visitors_this_week: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    pub original_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    pub original_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub full_name: String,
    pub email: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
