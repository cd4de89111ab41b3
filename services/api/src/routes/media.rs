//! Gallery endpoints: public browsing and admin management

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use auth::{AuthUser, validation::validate_max_len};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        media::{
            BulkDeleteRequest, MediaCategory, MediaListResponse, MediaQuery, NewMediaItem,
            UpdateMediaRequest,
        },
        paginate,
    },
    repositories::media::MediaFilter,
    state::AppState,
    storage::{StorageError, classify},
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

fn is_admin(user: &Option<Extension<AuthUser>>) -> bool {
    user.as_ref().is_some_and(|Extension(user)| user.is_admin())
}

/// `GET /api/media/:category`
pub async fn list_category(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(category): Path<String>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<impl IntoResponse> {
    let category: MediaCategory = category.parse().map_err(ApiError::Validation)?;
    let (page, limit) = paginate(query.page, query.limit, DEFAULT_LIMIT, MAX_LIMIT);

    let (media, total) = state
        .media
        .list(&MediaFilter {
            category: Some(category),
            media_type: query.media_type,
            public_only: !is_admin(&user),
            limit,
            offset: (page - 1) * limit,
        })
        .await?;

    Ok(Json(MediaListResponse {
        category: Some(category),
        media,
        total,
        page,
        limit,
    }))
}

/// `GET /api/media/item/:id`. Hidden items do not exist for anonymous callers.
pub async fn get_item(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let admin = is_admin(&user);
    let mut item = state
        .media
        .get_by_id(id)
        .await?
        .filter(|item| admin || item.is_public)
        .ok_or_else(|| ApiError::NotFound("Media not found".to_string()))?;

    if !admin {
        match state.media.increment_views(id).await {
            Ok(()) => item.view_count += 1,
            Err(e) => warn!(media_id = %id, error = %e, "Failed to count media view"),
        }
    }

    Ok(Json(item))
}

/// `GET /api/admin/media`
pub async fn admin_list(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<impl IntoResponse> {
    let (page, limit) = paginate(query.page, query.limit, DEFAULT_LIMIT, MAX_LIMIT);

    let (media, total) = state
        .media
        .list(&MediaFilter {
            category: query.category,
            media_type: query.media_type,
            public_only: false,
            limit,
            offset: (page - 1) * limit,
        })
        .await?;

    Ok(Json(MediaListResponse {
        category: query.category,
        media,
        total,
        page,
        limit,
    }))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Validation(e.body_text())
    }
}

fn parse_flag(field: &str, value: &str) -> ApiResult<bool> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("{field} must be true or false")))
}

/// Tags arrive either as a JSON array or as a comma-separated list
fn parse_tags(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(value) {
            return tags;
        }
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    alt: Option<String>,
    tags: Vec<String>,
    is_public: Option<bool>,
    is_featured: Option<bool>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.file = Some((file_name, bytes.to_vec()));
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        let text = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name.as_str() {
            "title" => form.title = text,
            "description" => form.description = text,
            "category" => form.category = text,
            "alt" => form.alt = text,
            "tags" => form.tags = parse_tags(&value),
            "is_public" => form.is_public = Some(parse_flag("is_public", &value)?),
            "is_featured" => form.is_featured = Some(parse_flag("is_featured", &value)?),
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /api/admin/media` (multipart)
pub async fn upload(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_upload(multipart).await?;

    let (original_name, bytes) = form
        .file
        .ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }
    let category: MediaCategory = form
        .category
        .ok_or_else(|| ApiError::Validation("Category is required".to_string()))?
        .parse()
        .map_err(ApiError::Validation)?;
    let kind = classify(&original_name)?;

    let title = form.title.unwrap_or_else(|| {
        std::path::Path::new(&original_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });
    validate_max_len("Title", &title, 255).map_err(ApiError::Validation)?;
    if let Some(alt) = &form.alt {
        validate_max_len("Alt text", alt, 255).map_err(ApiError::Validation)?;
    }

    let id = Uuid::new_v4();
    let stored = match state.storage.save(id, &kind, &bytes).await {
        Ok(stored) => stored,
        Err(StorageError::TooLarge(limit)) => {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the {limit} byte limit"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let new_item = NewMediaItem {
        id,
        title,
        description: form.description,
        category,
        media_type: kind.media_type,
        url: stored.url.clone(),
        file_name: stored.file_name,
        file_size: stored.size,
        mime_type: kind.mime_type.to_string(),
        alt: form.alt,
        tags: form.tags,
        is_public: form.is_public.unwrap_or(true),
        is_featured: form.is_featured.unwrap_or(false),
        uploaded_by: admin.id,
    };

    let item = match state.media.insert(&new_item).await {
        Ok(item) => item,
        Err(e) => {
            state.storage.remove(&stored.url).await;
            return Err(e.into());
        }
    };

    info!(media_id = %item.id, category = %item.category, uploaded_by = %admin.id, "Media uploaded");
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/admin/media/:id`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateMediaRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("Title cannot be empty".to_string()));
        }
        validate_max_len("Title", title, 255).map_err(ApiError::Validation)?;
    }

    let item = state
        .media
        .update(id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Media not found".to_string()))?;

    info!(media_id = %id, "Media updated");
    Ok(Json(item))
}

/// `DELETE /api/admin/media/:id`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let item = state
        .media
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Media not found".to_string()))?;

    state.storage.remove(&item.url).await;
    info!(media_id = %id, "Media deleted");

    Ok(Json(json!({ "message": "Media deleted successfully" })))
}

/// `POST /api/admin/media/bulk-delete`
pub async fn bulk_delete(
    State(state): State<AppState>,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.ids.is_empty() {
        return Err(ApiError::Validation("No media ids given".to_string()));
    }

    let deleted = state.media.delete_many(&request.ids).await?;
    for item in &deleted {
        state.storage.remove(&item.url).await;
    }

    info!(requested = request.ids.len(), deleted = deleted.len(), "Bulk media delete");
    Ok(Json(json!({
        "message": format!("{} media items deleted", deleted.len()),
        "deleted": deleted.len(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("sunset, beach ,,gold"), vec!["sunset", "beach", "gold"]);
        assert_eq!(parse_tags(r#"["a b","c"]"#), vec!["a b", "c"]);
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("is_public", " true").unwrap());
        assert!(!parse_flag("is_public", "false").unwrap());
        assert!(parse_flag("is_public", "yes").is_err());
    }
}
