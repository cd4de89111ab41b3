//! Media models for the API service

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gallery a media item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Athletes,
    Food,
    Nature,
    Portraits,
    Action,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 5] = [
        MediaCategory::Athletes,
        MediaCategory::Food,
        MediaCategory::Nature,
        MediaCategory::Portraits,
        MediaCategory::Action,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Athletes => "athletes",
            MediaCategory::Food => "food",
            MediaCategory::Nature => "nature",
            MediaCategory::Portraits => "portraits",
            MediaCategory::Action => "action",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                "Invalid category. Must be one of: athletes, food, nature, portraits, action"
                    .to_string()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Media type and MIME type for an accepted upload extension
    /// (lowercase, with the leading dot).
    pub fn from_extension(ext: &str) -> Option<(MediaType, &'static str)> {
        match ext {
            ".jpg" | ".jpeg" => Some((MediaType::Image, "image/jpeg")),
            ".png" => Some((MediaType::Image, "image/png")),
            ".gif" => Some((MediaType::Image, "image/gif")),
            ".webp" => Some((MediaType::Image, "image/webp")),
            ".mp4" => Some((MediaType::Video, "video/mp4")),
            ".mov" => Some((MediaType::Video, "video/quicktime")),
            ".avi" => Some((MediaType::Video, "video/x-msvideo")),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(format!("Invalid media type: {other}")),
        }
    }
}

/// Media item model
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: MediaCategory,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub alt: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_featured: bool,
    pub sort_order: i32,
    pub view_count: i64,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a freshly uploaded file
#[derive(Debug, Clone)]
pub struct NewMediaItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: MediaCategory,
    pub media_type: MediaType,
    pub url: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub alt: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_featured: bool,
    pub uploaded_by: Uuid,
}

/// Partial update of a media item; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<MediaCategory>,
    pub alt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Query parameters for media listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Number of items per page
    pub limit: Option<i64>,
    pub category: Option<MediaCategory>,
    /// Filter by media type
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
}

/// Response for media listing with pagination
#[derive(Debug, Clone, Serialize)]
pub struct MediaListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<MediaCategory>,
    pub media: Vec<MediaItem>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(
            MediaType::from_extension(".jpeg"),
            Some((MediaType::Image, "image/jpeg"))
        );
        assert_eq!(MediaType::from_extension(".mov").map(|t| t.0), Some(MediaType::Video));
        assert_eq!(MediaType::from_extension(".exe"), None);
        assert_eq!(MediaType::from_extension(".JPG"), None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("food".parse::<MediaCategory>(), Ok(MediaCategory::Food));
        assert!("weddings".parse::<MediaCategory>().is_err());
    }
}
