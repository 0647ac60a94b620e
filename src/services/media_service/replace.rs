use super::{MediaService, NewMediaGroup, ReplaceMedia, types::PreparedGroup};
use crate::api::error::AppError;
use crate::entities::media_variants;
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use crate::services::tag_service::TagService;
use sea_orm::TransactionTrait;
use serde_json::json;

impl MediaService {
    /// Replaces a group with one derived from a new source.
    ///
    /// The new files are written first and the row swap happens in one transaction,
    /// so a failure at any point leaves the old group intact. Old files are removed
    /// only after the swap commits.
    pub async fn replace_group(
        &self,
        group_key: &str,
        replacement: ReplaceMedia,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        let old = MediaRepository::find_group(&self.db, group_key).await?;
        let first = old
            .first()
            .cloned()
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
        let was_selected = old.iter().any(|row| row.is_selected_cover);
        let old_paths: Vec<String> = old.iter().map(|row| row.storage_path.clone()).collect();

        let PreparedGroup {
            group_key: new_key,
            owner_id,
            rows,
            paths,
            ..
        } = self
            .prepare_group(
                NewMediaGroup {
                    owner_id: first.owner_id.clone(),
                    origin: first.origin,
                    source_bytes: replacement.source_bytes,
                    original_name: replacement.original_name.or(first.original_name),
                    alt_text: replacement.alt_text.or(first.alt_text),
                    crop: replacement.crop,
                    sort_order: first.sort_order,
                    tags: Vec::new(),
                },
                "replace",
            )
            .await?;

        let outcome: Result<Vec<media_variants::Model>, AppError> = async {
            let txn = self.db.begin().await?;

            MediaRepository::delete_group(&txn, group_key).await?;
            MediaRepository::insert_group(&txn, rows).await?;
            if was_selected {
                MediaRepository::select_cover(&txn, &new_key).await?;
            }
            TagService::move_media_tags(&txn, group_key, &new_key).await?;

            let rows = MediaRepository::find_group(&txn, &new_key).await?;
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
                    operation = "replace",
                    "Replacement rows not persisted, keeping old group: {}",
                    e
                );
                self.store.discard_all(&paths).await;
                return Err(e);
            }
        };

        self.store.discard_all(&old_paths).await;
        self.invalidate().await;

        tracing::info!("🔁 Media group {} replaced by {}", group_key, new_key);
        self.audit
            .log(
                AuditEventType::MediaReplace,
                Some(actor_id.to_string()),
                Some(new_key.clone()),
                "replace_group",
                "success",
                Some(json!({ "previous_group_key": group_key, "owner_id": owner_id })),
            )
            .await;

        Ok(rows)
    }
}
