use super::forms::{MultipartForm, read_multipart};
use crate::AppState;
use crate::api::error::AppError;
use crate::entities::media_variants::{self, MediaOrigin};
use crate::models::{
    ApiResponse, MediaGroupEnvelope, MediaListResponse, MediaVariantView, MessageResponse,
};
use crate::services::catalog::MediaFilters;
use crate::services::media_service::{MediaUpdate, NewMediaGroup, ReplaceMedia};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};

const MAX_ALT_TEXT: usize = 255;

fn alt_text_field(form: &MultipartForm) -> Result<Option<String>, AppError> {
    let alt_text = form.raw("alt_text").map(|a| a.trim().to_string());
    if alt_text
        .as_ref()
        .is_some_and(|a| a.chars().count() > MAX_ALT_TEXT)
    {
        return Err(AppError::field(
            "alt_text",
            format!("Alt text must be at most {} characters", MAX_ALT_TEXT),
        ));
    }
    Ok(alt_text)
}

fn envelope(state: &AppState, group: Vec<media_variants::Model>) -> MediaGroupEnvelope {
    MediaGroupEnvelope {
        media: MediaVariantView::from_group(group, state.media_service.store()),
    }
}

#[utoipa::path(
    get,
    path = "/media",
    params(MediaFilters),
    responses(
        (status = 200, description = "Paginated original variants with sibling URLs", body = MediaListResponse),
        (status = 422, description = "Invalid filter value")
    ),
    security(("jwt" = [])),
    tag = "media"
)]
pub async fn list_media(
    State(state): State<AppState>,
    Query(filters): Query<MediaFilters>,
) -> Result<Json<ApiResponse<MediaListResponse>>, AppError> {
    let page = state.catalog.paginate_media(filters).await?;
    Ok(Json(ApiResponse::new(page)))
}

#[utoipa::path(
    get,
    path = "/media/{id}",
    params(("id" = String, Path, description = "Any variant ID of the group")),
    responses(
        (status = 200, description = "All variants of the group", body = MediaGroupEnvelope),
        (status = 404, description = "Media not found")
    ),
    security(("jwt" = [])),
    tag = "media"
)]
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MediaGroupEnvelope>>, AppError> {
    let media = state.catalog.get_media_group(&id).await?;
    Ok(Json(ApiResponse::new(MediaGroupEnvelope { media })))
}

#[utoipa::path(
    post,
    path = "/media",
    request_body(content = Object, description = "file, gallery_id, alt_text, sort_order, tags[], crop_*", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Variant group created", body = MediaGroupEnvelope),
        (status = 413, description = "File too large"),
        (status = 422, description = "Validation failed")
    ),
    security(("jwt" = [])),
    tag = "media"
)]
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<MediaGroupEnvelope>>), AppError> {
    let mut form = read_multipart(&mut multipart, &["file"], state.config.max_upload_size).await?;
    let alt_text = alt_text_field(&form)?.filter(|a| !a.is_empty());
    let sort_order = form.int("sort_order")?.unwrap_or(0);
    let crop = form.crop_box()?;
    let owner_id = form.value("gallery_id");
    let tags = form.tags.take().unwrap_or_default();
    let image = form
        .take_image("file")
        .ok_or_else(|| AppError::field("file", "An image file is required"))?;

    let group = state
        .media_service
        .create_group(
            NewMediaGroup {
                owner_id,
                origin: MediaOrigin::Standalone,
                source_bytes: image.bytes,
                original_name: image.file_name,
                alt_text,
                crop,
                sort_order,
                tags,
            },
            &claims.sub,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(envelope(&state, group))),
    ))
}

#[utoipa::path(
    put,
    path = "/media/{id}",
    params(("id" = String, Path, description = "Any variant ID of the group")),
    request_body(content = Object, description = "Optional file, gallery_id (blank detaches), alt_text, sort_order, tags[], crop_*", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Group updated; a new file yields a new group", body = MediaGroupEnvelope),
        (status = 404, description = "Media not found"),
        (status = 422, description = "Validation failed")
    ),
    security(("jwt" = [])),
    tag = "media"
)]
pub async fn update_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<MediaGroupEnvelope>>, AppError> {
    let mut form = read_multipart(&mut multipart, &["file"], state.config.max_upload_size).await?;
    let alt_text = alt_text_field(&form)?;
    let sort_order = form.int("sort_order")?;
    let crop = form.crop_box()?;
    let owner_id = form.has("gallery_id").then(|| form.value("gallery_id"));
    let tags = form.tags.take();

    let replacement = form.take_image("file").map(|image| ReplaceMedia {
        source_bytes: image.bytes,
        original_name: image.file_name,
        crop,
        alt_text: alt_text.clone().filter(|a| !a.is_empty()),
    });

    let group = state
        .media_service
        .update_media(
            &id,
            MediaUpdate {
                replacement,
                owner_id,
                alt_text,
                tags,
                sort_order,
            },
            &claims.sub,
        )
        .await?;

    Ok(Json(ApiResponse::new(envelope(&state, group))))
}

#[utoipa::path(
    delete,
    path = "/media/{id}",
    params(("id" = String, Path, description = "Any variant ID of the group")),
    responses(
        (status = 200, description = "Group and its files deleted", body = MessageResponse),
        (status = 404, description = "Media not found")
    ),
    security(("jwt" = [])),
    tag = "media"
)]
pub async fn delete_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let group = state.media_service.get_group(&id).await?;
    let group_key = group
        .first()
        .map(|row| row.group_key.clone())
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
    state
        .media_service
        .delete_group(&group_key, &claims.sub)
        .await?;

    Ok(Json(MessageResponse {
        message: "Media deleted".to_string(),
    }))
}
