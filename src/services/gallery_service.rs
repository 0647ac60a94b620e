use crate::api::error::AppError;
use crate::entities::media_variants::MediaOrigin;
use crate::entities::{galleries, gallery_tags, prelude::*};
use crate::services::audit::{AuditEventType, AuditService};
use crate::services::cache::{CacheVersionGate, scopes};
use crate::services::crop::CropBox;
use crate::services::media_repository::MediaRepository;
use crate::services::media_service::{MediaService, NewMediaGroup, ReplaceMedia};
use crate::services::tag_service::TagService;
use crate::utils::slug::{slugify, with_suffix};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Field values for a gallery write. On update `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct GalleryChanges {
    pub title: Option<String>,
    /// `Some("")` clears the description
    pub description: Option<String>,
    /// `Some("")` clears the category
    pub category_id: Option<String>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Cover image supplied with a gallery write
pub struct CoverUpload {
    pub bytes: Vec<u8>,
    pub original_name: Option<String>,
    pub crop: Option<CropBox>,
    pub alt_text: Option<String>,
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Clone)]
pub struct GalleryService {
    db: DatabaseConnection,
    media: MediaService,
    cache: CacheVersionGate,
    audit: AuditService,
}

impl GalleryService {
    pub fn new(db: DatabaseConnection, media: MediaService, cache: CacheVersionGate) -> Self {
        let audit = AuditService::new(db.clone());
        Self {
            db,
            media,
            cache,
            audit,
        }
    }

    async fn ensure_category(
        db: &impl ConnectionTrait,
        category_id: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(id) = category_id
            && Categories::find_by_id(id.to_string()).one(db).await?.is_none()
        {
            return Err(AppError::field("category_id", "Category does not exist"));
        }
        Ok(())
    }

    /// First free slug among `base`, `base-2`, `base-3`, ... Soft-deleted galleries
    /// keep their slugs.
    async fn unique_slug(db: &impl ConnectionTrait, title: &str) -> Result<String, AppError> {
        let base = match slugify(title) {
            s if s.is_empty() => "gallery".to_string(),
            s => s,
        };
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = with_suffix(&base, attempt);
            let taken = Galleries::find()
                .filter(galleries::Column::Slug.eq(&candidate))
                .count(db)
                .await?
                > 0;
            if !taken {
                return Ok(candidate);
            }
        }
        Ok(format!("{}-{}", base, &Uuid::new_v4().simple().to_string()[..8]))
    }

    async fn find_active(&self, id: &str) -> Result<galleries::Model, AppError> {
        Galleries::find_by_id(id.to_string())
            .filter(galleries::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Gallery not found".to_string()))
    }

    /// Creates a gallery and, when given, its cover group. A cover failure removes
    /// the gallery again.
    pub async fn create(
        &self,
        changes: GalleryChanges,
        cover: Option<CoverUpload>,
        actor_id: &str,
    ) -> Result<galleries::Model, AppError> {
        let title = changes
            .title
            .and_then(blank_to_none)
            .ok_or_else(|| AppError::field("title", "Title is required"))?;
        let category_id = changes.category_id.and_then(blank_to_none);
        Self::ensure_category(&self.db, category_id.as_deref()).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let gallery = galleries::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            slug: Set(Self::unique_slug(&txn, &title).await?),
            title: Set(title),
            description: Set(changes.description.and_then(blank_to_none)),
            category_id: Set(category_id),
            is_active: Set(changes.is_active.unwrap_or(true)),
            is_public: Set(changes.is_public.unwrap_or(true)),
            item_count: Set(0),
            created_by: Set(Some(actor_id.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;
        if let Some(tags) = &changes.tags {
            TagService::sync_gallery_tags(&txn, &gallery.id, tags).await?;
        }
        txn.commit().await?;

        if let Some(cover) = cover {
            let upload = NewMediaGroup {
                owner_id: Some(gallery.id.clone()),
                origin: MediaOrigin::Cover,
                source_bytes: cover.bytes,
                original_name: cover.original_name,
                alt_text: cover.alt_text,
                crop: cover.crop,
                sort_order: 0,
                tags: Vec::new(),
            };
            if let Err(e) = self.media.create_group(upload, actor_id).await {
                tracing::error!(
                    "Cover upload failed for new gallery {}, removing it: {}",
                    gallery.id,
                    e
                );
                self.remove_gallery_row(&gallery).await;
                return Err(e);
            }
        }

        self.cache.bump_version(scopes::GALLERIES).await;
        tracing::info!("🖼️ Gallery created: {} ({})", gallery.title, gallery.slug);
        self.audit
            .log(
                AuditEventType::GalleryCreate,
                Some(actor_id.to_string()),
                Some(gallery.id.clone()),
                "create_gallery",
                "success",
                Some(json!({ "slug": gallery.slug })),
            )
            .await;

        Ok(gallery)
    }

    async fn remove_gallery_row(&self, gallery: &galleries::Model) {
        let cleanup: Result<(), sea_orm::DbErr> = async {
            let txn = self.db.begin().await?;
            GalleryTags::delete_many()
                .filter(gallery_tags::Column::GalleryId.eq(&gallery.id))
                .exec(&txn)
                .await?;
            gallery.clone().delete(&txn).await?;
            txn.commit().await
        }
        .await;
        if let Err(e) = cleanup {
            tracing::error!("Failed to remove gallery {}: {}", gallery.id, e);
        }
    }

    /// Writes `cover` as the gallery's cover group and selects it. An existing
    /// cover-origin group is replaced; standalone media is never touched.
    async fn apply_cover(
        &self,
        gallery_id: &str,
        cover: CoverUpload,
        actor_id: &str,
    ) -> Result<(), AppError> {
        let rows = match MediaRepository::cover_origin_group(&self.db, gallery_id).await? {
            Some(group_key) => {
                self.media
                    .replace_group(
                        &group_key,
                        ReplaceMedia {
                            source_bytes: cover.bytes,
                            original_name: cover.original_name,
                            crop: cover.crop,
                            alt_text: cover.alt_text,
                        },
                        actor_id,
                    )
                    .await?
            }
            None => {
                self.media
                    .create_group(
                        NewMediaGroup {
                            owner_id: Some(gallery_id.to_string()),
                            origin: MediaOrigin::Cover,
                            source_bytes: cover.bytes,
                            original_name: cover.original_name,
                            alt_text: cover.alt_text,
                            crop: cover.crop,
                            sort_order: 0,
                            tags: Vec::new(),
                        },
                        actor_id,
                    )
                    .await?
            }
        };

        let media_id = rows
            .first()
            .map(|row| row.id.clone())
            .ok_or_else(|| AppError::Internal("Cover group has no rows".to_string()))?;
        self.media
            .set_selected_cover(gallery_id, &media_id, actor_id)
            .await?;
        Ok(())
    }

    /// Updates gallery fields. The slug never changes. A new cover is written and
    /// selected before any field is saved, so a cover failure leaves the gallery
    /// as it was.
    pub async fn update(
        &self,
        id: &str,
        changes: GalleryChanges,
        cover: Option<CoverUpload>,
        actor_id: &str,
    ) -> Result<galleries::Model, AppError> {
        let existing = self.find_active(id).await?;

        let title = match changes.title {
            Some(title) => Some(
                blank_to_none(title).ok_or_else(|| AppError::field("title", "Title is required"))?,
            ),
            None => None,
        };
        let category_id = changes.category_id.map(blank_to_none);
        if let Some(Some(category_id)) = &category_id {
            Self::ensure_category(&self.db, Some(category_id)).await?;
        }

        if let Some(cover) = cover {
            self.apply_cover(&existing.id, cover, actor_id).await?;
        }

        let txn = self.db.begin().await?;
        let mut active: galleries::ActiveModel = existing.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(blank_to_none(description));
        }
        if let Some(category_id) = category_id {
            active.category_id = Set(category_id);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_public) = changes.is_public {
            active.is_public = Set(is_public);
        }
        active.updated_at = Set(Utc::now());
        let gallery = active.update(&txn).await?;
        if let Some(tags) = &changes.tags {
            TagService::sync_gallery_tags(&txn, &gallery.id, tags).await?;
        }
        txn.commit().await?;

        self.cache.bump_version(scopes::GALLERIES).await;
        self.audit
            .log(
                AuditEventType::GalleryUpdate,
                Some(actor_id.to_string()),
                Some(gallery.id.clone()),
                "update_gallery",
                "success",
                None,
            )
            .await;

        Ok(gallery)
    }

    /// Soft delete. Media rows and their files are kept.
    pub async fn delete(&self, id: &str, actor_id: &str) -> Result<(), AppError> {
        let existing = self.find_active(id).await?;

        let mut active: galleries::ActiveModel = existing.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        self.cache.bump_version(scopes::GALLERIES).await;
        tracing::info!("🗑️ Gallery {} soft deleted", id);
        self.audit
            .log(
                AuditEventType::GalleryDelete,
                Some(actor_id.to_string()),
                Some(id.to_string()),
                "delete_gallery",
                "success",
                None,
            )
            .await;

        Ok(())
    }
}
