use super::{MediaService, NewMediaGroup, ensure_owner, types::PreparedGroup};
use crate::api::error::AppError;
use crate::entities::media_variants::{self, MediaOrigin};
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use crate::services::tag_service::TagService;
use crate::services::variant_deriver::{MediaProcessingError, derive_variants_blocking};
use crate::services::variant_store::build_path;
use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use serde_json::json;
use uuid::Uuid;

impl MediaService {
    /// Derives the variant set and writes every file. On a storage failure the files
    /// already written are removed again.
    pub(super) async fn prepare_group(
        &self,
        group: NewMediaGroup,
        operation: &'static str,
    ) -> Result<PreparedGroup, AppError> {
        let group_key = Uuid::new_v4().to_string();
        let owner_id = group.owner_id;

        let derived = derive_variants_blocking(group.source_bytes, group.crop, self.policy)
            .await
            .map_err(|e| {
                tracing::error!(
                    owner_id = ?owner_id,
                    group_key = %group_key,
                    operation,
                    "Variant derivation failed: {}",
                    e
                );
                AppError::MediaProcessing(e)
            })?;

        let now = Utc::now();
        let mut rows = Vec::with_capacity(3);
        let mut paths = Vec::with_capacity(3);

        for (kind, image) in derived.into_kinds() {
            let path = build_path(owner_id.as_deref(), kind, now, &image.extension);
            let byte_size = image.bytes.len() as i64;

            if let Err(e) = self.store.put(&path, image.bytes, &image.mime_type).await {
                tracing::error!(
                    owner_id = ?owner_id,
                    group_key = %group_key,
                    operation,
                    "Failed to store {} variant at {}: {}",
                    kind.folder(),
                    path,
                    e
                );
                self.store.discard_all(&paths).await;
                return Err(MediaProcessingError::Storage(e.to_string()).into());
            }
            paths.push(path.clone());

            rows.push(media_variants::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                owner_id: Set(owner_id.clone()),
                group_key: Set(group_key.clone()),
                variant_kind: Set(kind),
                origin: Set(group.origin),
                storage_path: Set(path),
                original_name: Set(group.original_name.clone()),
                extension: Set(image.extension),
                mime_type: Set(image.mime_type),
                byte_size: Set(byte_size),
                width: Set(image.width as i32),
                height: Set(image.height as i32),
                is_cover_candidate: Set(kind.is_cover_candidate()),
                is_selected_cover: Set(false),
                alt_text: Set(group.alt_text.clone()),
                sort_order: Set(group.sort_order),
                uploaded_at: Set(now),
            });
        }

        Ok(PreparedGroup {
            group_key,
            owner_id,
            origin: group.origin,
            tags: group.tags,
            rows,
            paths,
        })
    }

    /// Creates a variant group from an upload. The first group a gallery receives
    /// becomes its selected cover.
    pub async fn create_group(
        &self,
        group: NewMediaGroup,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        ensure_owner(&self.db, group.owner_id.as_deref()).await?;

        let PreparedGroup {
            group_key,
            owner_id,
            origin,
            tags,
            rows,
            paths,
        } = self.prepare_group(group, "create").await?;

        let outcome: Result<Vec<media_variants::Model>, AppError> = async {
            let txn = self.db.begin().await?;

            MediaRepository::insert_group(&txn, rows).await?;

            if let Some(owner) = owner_id.as_deref() {
                if !MediaRepository::has_selected_cover(&txn, owner).await? {
                    MediaRepository::select_cover(&txn, &group_key).await?;
                }
                if origin == MediaOrigin::Standalone {
                    MediaRepository::adjust_item_count(&txn, owner, 1).await?;
                }
            }

            if !tags.is_empty() {
                TagService::sync_media_tags(&txn, &group_key, &tags).await?;
            }

            let rows = MediaRepository::find_group(&txn, &group_key).await?;
            txn.commit().await?;
            Ok(rows)
        }
        .await;

        let rows = match outcome {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    owner_id = ?owner_id,
                    group_key = %group_key,
                    operation = "create",
                    "Media rows not persisted, removing stored files: {}",
                    e
                );
                self.store.discard_all(&paths).await;
                return Err(e);
            }
        };

        self.invalidate().await;
        tracing::info!("📸 Media group {} created ({} variants)", group_key, rows.len());
        self.audit
            .log(
                AuditEventType::MediaUpload,
                Some(actor_id.to_string()),
                Some(group_key),
                "create_group",
                "success",
                Some(json!({ "owner_id": owner_id })),
            )
            .await;

        Ok(rows)
    }
}
