//! Media repository for database operations

use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::models::media::{MediaCategory, MediaItem, MediaType, NewMediaItem, UpdateMediaRequest};

const MEDIA_COLUMNS: &str = "id, title, description, category, media_type, url, thumbnail_url, \
     file_name, file_size, mime_type, width, height, alt, tags, is_public, is_featured, \
     sort_order, view_count, uploaded_by, created_at, updated_at";

/// Listing filter for media items
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub category: Option<MediaCategory>,
    pub media_type: Option<MediaType>,
    /// Hide items that are not public
    pub public_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Media repository for database operations
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

fn map_media(row: &PgRow) -> DatabaseResult<MediaItem> {
    let category: String = row.get("category");
    let media_type: String = row.get("media_type");
    let Json(tags): Json<Vec<String>> = row.get("tags");

    Ok(MediaItem {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: category.parse().map_err(DatabaseError::Decode)?,
        media_type: media_type.parse().map_err(DatabaseError::Decode)?,
        url: row.get("url"),
        thumbnail_url: row.get("thumbnail_url"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        mime_type: row.get("mime_type"),
        width: row.get("width"),
        height: row.get("height"),
        alt: row.get("alt"),
        tags,
        is_public: row.get("is_public"),
        is_featured: row.get("is_featured"),
        sort_order: row.get("sort_order"),
        view_count: row.get("view_count"),
        uploaded_by: row.get("uploaded_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl MediaRepository {
    /// Create a new media repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a media item by ID
    pub async fn get_by_id(&self, id: Uuid) -> DatabaseResult<Option<MediaItem>> {
        let row = sqlx::query(&format!("SELECT {MEDIA_COLUMNS} FROM media_items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_media).transpose()
    }

    /// Get media items with pagination and filtering, newest first
    pub async fn list(&self, filter: &MediaFilter) -> DatabaseResult<(Vec<MediaItem>, i64)> {
        let category = filter.category.map(|c| c.as_str());
        let media_type = filter.media_type.map(|t| t.as_str());
        let conditions = r#"
            ($1::text IS NULL OR category = $1)
            AND ($2::text IS NULL OR media_type = $2)
            AND (NOT $3 OR is_public)
        "#;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MEDIA_COLUMNS}
            FROM media_items
            WHERE {conditions}
            ORDER BY sort_order ASC, created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(category)
        .bind(media_type)
        .bind(filter.public_only)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM media_items WHERE {conditions}"
        ))
        .bind(category)
        .bind(media_type)
        .bind(filter.public_only)
        .fetch_one(&self.pool)
        .await?;

        let items = rows.iter().map(map_media).collect::<DatabaseResult<Vec<_>>>()?;
        Ok((items, total))
    }

    pub async fn increment_views(&self, id: Uuid) -> DatabaseResult<()> {
        sqlx::query("UPDATE media_items SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert(&self, item: &NewMediaItem) -> DatabaseResult<MediaItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO media_items (id, title, description, category, media_type, url,
                                     thumbnail_url, file_name, file_size, mime_type, alt, tags,
                                     is_public, is_featured, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {MEDIA_COLUMNS}
            "#
        ))
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.media_type.as_str())
        .bind(&item.url)
        .bind(&item.file_name)
        .bind(item.file_size)
        .bind(&item.mime_type)
        .bind(&item.alt)
        .bind(Json(&item.tags))
        .bind(item.is_public)
        .bind(item.is_featured)
        .bind(item.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        map_media(&row)
    }

    /// Apply the fields present in `update`. Returns `None` for an unknown id.
    pub async fn update(
        &self,
        id: Uuid,
        update: &UpdateMediaRequest,
    ) -> DatabaseResult<Option<MediaItem>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE media_items SET
                title       = COALESCE($2, title),
                description = COALESCE($3, description),
                category    = COALESCE($4, category),
                alt         = COALESCE($5, alt),
                tags        = COALESCE($6, tags),
                is_public   = COALESCE($7, is_public),
                is_featured = COALESCE($8, is_featured),
                sort_order  = COALESCE($9, sort_order),
                updated_at  = NOW()
            WHERE id = $1
            RETURNING {MEDIA_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.category.map(|c| c.as_str()))
        .bind(&update.alt)
        .bind(update.tags.as_ref().map(Json))
        .bind(update.is_public)
        .bind(update.is_featured)
        .bind(update.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_media).transpose()
    }

    /// Delete a media item, returning the removed row
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<Option<MediaItem>> {
        let row = sqlx::query(&format!(
            "DELETE FROM media_items WHERE id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_media).transpose()
    }

    /// Delete several media items, returning the rows that existed
    pub async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<Vec<MediaItem>> {
        let rows = sqlx::query(&format!(
            "DELETE FROM media_items WHERE id = ANY($1) RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_media).collect()
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
