use crate::entities::media_variants::{self, MediaOrigin, VariantKind};
use crate::entities::{galleries, tags};
use crate::services::variant_store::VariantStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard `{ "data": ... }` envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagView {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<tags::Model> for TagView {
    fn from(tag: tags::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

pub fn tag_views(tags: Option<Vec<tags::Model>>) -> Vec<TagView> {
    tags.unwrap_or_default().into_iter().map(TagView::from).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaVariantView {
    pub id: String,
    pub group_key: String,
    pub owner_id: Option<String>,
    pub variant_kind: VariantKind,
    pub origin: MediaOrigin,
    pub url: String,
    pub original_name: Option<String>,
    pub extension: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub width: i32,
    pub height: i32,
    pub is_cover_candidate: bool,
    pub is_selected_cover: bool,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl MediaVariantView {
    pub fn from_model(model: media_variants::Model, store: &VariantStore) -> Self {
        Self {
            url: store.public_url(&model.storage_path),
            id: model.id,
            group_key: model.group_key,
            owner_id: model.owner_id,
            variant_kind: model.variant_kind,
            origin: model.origin,
            original_name: model.original_name,
            extension: model.extension,
            mime_type: model.mime_type,
            byte_size: model.byte_size,
            width: model.width,
            height: model.height,
            is_cover_candidate: model.is_cover_candidate,
            is_selected_cover: model.is_selected_cover,
            alt_text: model.alt_text,
            sort_order: model.sort_order,
            uploaded_at: model.uploaded_at,
        }
    }

    pub fn from_group(group: Vec<media_variants::Model>, store: &VariantStore) -> Vec<Self> {
        group
            .into_iter()
            .map(|m| Self::from_model(m, store))
            .collect()
    }
}

fn variant_url(
    group: &[media_variants::Model],
    kind: VariantKind,
    store: &VariantStore,
) -> Option<String> {
    group
        .iter()
        .find(|m| m.variant_kind == kind)
        .map(|m| store.public_url(&m.storage_path))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CoverView {
    pub media_id: Option<String>,
    pub group_key: String,
    pub large_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
}

impl CoverView {
    pub fn from_group(group: &[media_variants::Model], store: &VariantStore) -> Option<Self> {
        let first = group.first()?;
        Some(Self {
            media_id: group
                .iter()
                .find(|m| m.is_selected_cover)
                .map(|m| m.id.clone()),
            group_key: first.group_key.clone(),
            large_url: variant_url(group, VariantKind::Large, store),
            thumbnail_url: variant_url(group, VariantKind::Thumbnail, store),
            alt_text: first.alt_text.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GallerySummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    /// `active` or `inactive`
    pub status: String,
    /// `public` or `private`
    pub visibility: String,
    pub item_count: i32,
    pub cover: Option<CoverView>,
    pub tags: Vec<TagView>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GallerySummary {
    pub fn new(gallery: galleries::Model, cover: Option<CoverView>, tags: Vec<TagView>) -> Self {
        Self {
            id: gallery.id,
            title: gallery.title,
            slug: gallery.slug,
            description: gallery.description,
            category_id: gallery.category_id,
            status: if gallery.is_active { "active" } else { "inactive" }.to_string(),
            visibility: if gallery.is_public { "public" } else { "private" }.to_string(),
            item_count: gallery.item_count,
            cover,
            tags,
            created_by: gallery.created_by,
            created_at: gallery.created_at,
            updated_at: gallery.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaGroupView {
    pub group_key: String,
    pub origin: MediaOrigin,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_selected_cover: bool,
    pub tags: Vec<TagView>,
    pub variants: Vec<MediaVariantView>,
}

impl MediaGroupView {
    pub fn from_group(
        group: Vec<media_variants::Model>,
        tags: Vec<TagView>,
        store: &VariantStore,
    ) -> Option<Self> {
        let first = group.first()?.clone();
        Some(Self {
            group_key: first.group_key,
            origin: first.origin,
            alt_text: first.alt_text,
            sort_order: first.sort_order,
            is_selected_cover: group.iter().any(|m| m.is_selected_cover),
            tags,
            variants: MediaVariantView::from_group(group, store),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GalleryDetail {
    #[serde(flatten)]
    pub summary: GallerySummary,
    pub media: Vec<MediaGroupView>,
}

/// One row of the media listing: the group's original plus sibling URLs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaItem {
    pub id: String,
    pub group_key: String,
    pub gallery_id: Option<String>,
    pub origin: MediaOrigin,
    pub original_name: Option<String>,
    pub url: String,
    pub large_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub extension: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub width: i32,
    pub height: i32,
    pub alt_text: Option<String>,
    pub is_selected_cover: bool,
    pub tags: Vec<TagView>,
    pub uploaded_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn new(
        original: media_variants::Model,
        siblings: &[media_variants::Model],
        tags: Vec<TagView>,
        store: &VariantStore,
    ) -> Self {
        Self {
            url: store.public_url(&original.storage_path),
            large_url: variant_url(siblings, VariantKind::Large, store),
            thumbnail_url: variant_url(siblings, VariantKind::Thumbnail, store),
            is_selected_cover: siblings.iter().any(|m| m.is_selected_cover),
            id: original.id,
            group_key: original.group_key,
            gallery_id: original.owner_id,
            origin: original.origin,
            original_name: original.original_name,
            extension: original.extension,
            mime_type: original.mime_type,
            byte_size: original.byte_size,
            width: original.width,
            height: original.height,
            alt_text: original.alt_text,
            tags,
            uploaded_at: original.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GalleryListResponse {
    pub galleries: Vec<GallerySummary>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaListResponse {
    pub media: Vec<MediaItem>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GalleryEnvelope {
    pub gallery: GalleryDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaGroupEnvelope {
    pub media: Vec<MediaVariantView>,
}
