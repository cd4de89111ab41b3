//! Contact form models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageInfo;

/// A contact form submission
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/contact`
#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Trimmed, validated submission ready to store
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Query parameters for the admin message list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub is_read: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<ContactMessage>,
    pub unread_count: i64,
    #[serde(flatten)]
    pub page: PageInfo,
}
