use super::forms::{MultipartForm, read_multipart};
use crate::AppState;
use crate::api::error::AppError;
use crate::models::{
    ApiResponse, GalleryEnvelope, GalleryListResponse, MediaGroupEnvelope, MediaVariantView,
    MessageResponse,
};
use crate::services::catalog::GalleryFilters;
use crate::services::gallery_service::{CoverUpload, GalleryChanges};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

#[derive(Debug, Default, Validate)]
pub struct GalleryForm {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl GalleryForm {
    fn from_multipart(form: &MultipartForm) -> Result<Self, AppError> {
        Ok(Self {
            title: form.raw("title").map(|t| t.trim().to_string()),
            description: form.raw("description"),
            category_id: form.raw("category_id").map(|c| {
                if c.trim() == "null" {
                    String::new()
                } else {
                    c
                }
            }),
            is_active: form.choice("status", "active", "inactive")?,
            is_public: form.choice("visibility", "public", "private")?,
            tags: form.tags.clone(),
        })
    }

    fn into_changes(self) -> GalleryChanges {
        GalleryChanges {
            title: self.title,
            description: self.description,
            category_id: self.category_id,
            is_active: self.is_active,
            is_public: self.is_public,
            tags: self.tags,
        }
    }
}

fn cover_from(form: &mut MultipartForm) -> Result<Option<CoverUpload>, AppError> {
    let crop = form.crop_box()?;
    let alt_text = form.value("cover_alt_text");
    Ok(form.take_image("cover").map(|image| CoverUpload {
        bytes: image.bytes,
        original_name: image.file_name,
        crop,
        alt_text,
    }))
}

#[utoipa::path(
    get,
    path = "/galleries",
    params(GalleryFilters),
    responses(
        (status = 200, description = "Paginated galleries", body = GalleryListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn list_galleries(
    State(state): State<AppState>,
    Query(filters): Query<GalleryFilters>,
) -> Result<Json<ApiResponse<GalleryListResponse>>, AppError> {
    let page = state.catalog.paginate(filters).await?;
    Ok(Json(ApiResponse::new(page)))
}

#[utoipa::path(
    get,
    path = "/galleries/{id}",
    params(("id" = String, Path, description = "Gallery ID")),
    responses(
        (status = 200, description = "Gallery with its media groups", body = GalleryEnvelope),
        (status = 404, description = "Gallery not found")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GalleryEnvelope>>, AppError> {
    let gallery = state.catalog.get_by_id(&id).await?;
    Ok(Json(ApiResponse::new(GalleryEnvelope { gallery })))
}

#[utoipa::path(
    post,
    path = "/galleries",
    request_body(content = Object, description = "title, description, category_id, status, visibility, tags[], cover, crop_*", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Gallery created", body = GalleryEnvelope),
        (status = 422, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn create_gallery(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<GalleryEnvelope>>), AppError> {
    let mut form =
        read_multipart(&mut multipart, &["cover"], state.config.max_upload_size).await?;
    let gallery_form = GalleryForm::from_multipart(&form)?;
    if gallery_form.title.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::field("title", "Title is required"));
    }
    gallery_form.validate()?;
    let cover = cover_from(&mut form)?;

    let gallery = state
        .gallery_service
        .create(gallery_form.into_changes(), cover, &claims.sub)
        .await?;
    let detail = state.catalog.load_detail(&gallery.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(GalleryEnvelope { gallery: detail })),
    ))
}

#[utoipa::path(
    put,
    path = "/galleries/{id}",
    params(("id" = String, Path, description = "Gallery ID")),
    request_body(content = Object, description = "Any gallery field; a cover replaces the cover upload and becomes the selected cover", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Gallery updated", body = GalleryEnvelope),
        (status = 404, description = "Gallery not found"),
        (status = 422, description = "Validation failed")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn update_gallery(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<GalleryEnvelope>>, AppError> {
    let mut form =
        read_multipart(&mut multipart, &["cover"], state.config.max_upload_size).await?;
    let gallery_form = GalleryForm::from_multipart(&form)?;
    gallery_form.validate()?;
    let cover = cover_from(&mut form)?;

    let gallery = state
        .gallery_service
        .update(&id, gallery_form.into_changes(), cover, &claims.sub)
        .await?;
    let detail = state.catalog.load_detail(&gallery.id).await?;

    Ok(Json(ApiResponse::new(GalleryEnvelope { gallery: detail })))
}

#[utoipa::path(
    delete,
    path = "/galleries/{id}",
    params(("id" = String, Path, description = "Gallery ID")),
    responses(
        (status = 200, description = "Gallery soft deleted", body = MessageResponse),
        (status = 404, description = "Gallery not found")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn delete_gallery(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.gallery_service.delete(&id, &claims.sub).await?;
    Ok(Json(MessageResponse {
        message: "Gallery deleted".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/galleries/{id}/media/{media_id}/cover",
    params(
        ("id" = String, Path, description = "Gallery ID"),
        ("media_id" = String, Path, description = "Any variant ID of the group to select")
    ),
    responses(
        (status = 200, description = "Cover selected", body = MediaGroupEnvelope),
        (status = 404, description = "Gallery or media not found")
    ),
    security(("jwt" = [])),
    tag = "galleries"
)]
pub async fn set_gallery_cover(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, media_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MediaGroupEnvelope>>, AppError> {
    let group = state
        .media_service
        .set_selected_cover(&id, &media_id, &claims.sub)
        .await?;
    let media = MediaVariantView::from_group(group, state.media_service.store());
    Ok(Json(ApiResponse::new(MediaGroupEnvelope { media })))
}
