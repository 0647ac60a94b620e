use super::{MediaService, ensure_owner};
use crate::api::error::AppError;
use crate::entities::media_variants::{self, MediaOrigin};
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use crate::services::variant_store::rebase_path;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde_json::json;

impl MediaService {
    /// Moves a group to another gallery (or detaches it with `None`).
    ///
    /// Files whose move fails stay where they are and their rows keep the old path.
    /// Moved rows lose any cover selection. A source gallery left without a cover
    /// falls back to its remaining cover upload or first group; a target gallery
    /// without one adopts the moved group.
    pub async fn reassign_owner(
        &self,
        group_key: &str,
        new_owner_id: Option<String>,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        let group = MediaRepository::find_group(&self.db, group_key).await?;
        let first = group
            .first()
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
        let old_owner_id = first.owner_id.clone();
        let origin = first.origin;
        let was_selected = group.iter().any(|row| row.is_selected_cover);

        if old_owner_id == new_owner_id {
            return Ok(group);
        }
        ensure_owner(&self.db, new_owner_id.as_deref()).await?;

        // (row, path the row ends up with, whether its file actually moved)
        let mut placements = Vec::with_capacity(group.len());
        for row in group {
            let target = match rebase_path(&row.storage_path, new_owner_id.as_deref()) {
                Some(target) => target,
                None => {
                    tracing::warn!(
                        "Variant {} has a path outside the storage layout, not moving: {}",
                        row.id,
                        row.storage_path
                    );
                    let path = row.storage_path.clone();
                    placements.push((row, path, false));
                    continue;
                }
            };

            match self.store.move_to(&row.storage_path, &target).await {
                Ok(()) => placements.push((row, target, true)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping move of {} to {}: {}",
                        row.storage_path,
                        target,
                        e
                    );
                    let path = row.storage_path.clone();
                    placements.push((row, path, false));
                }
            }
        }

        let outcome: Result<Vec<media_variants::Model>, AppError> = async {
            let txn = self.db.begin().await?;

            for (row, path, _) in &placements {
                let mut active: media_variants::ActiveModel = row.clone().into();
                active.owner_id = Set(new_owner_id.clone());
                active.storage_path = Set(path.clone());
                active.is_selected_cover = Set(false);
                active.update(&txn).await?;
            }

            if was_selected && let Some(old) = old_owner_id.as_deref() {
                MediaRepository::select_fallback_cover(&txn, old).await?;
            }
            if let Some(new) = new_owner_id.as_deref()
                && !MediaRepository::has_selected_cover(&txn, new).await?
            {
                MediaRepository::select_cover(&txn, group_key).await?;
            }

            if origin == MediaOrigin::Standalone {
                if let Some(old) = old_owner_id.as_deref() {
                    MediaRepository::adjust_item_count(&txn, old, -1).await?;
                }
                if let Some(new) = new_owner_id.as_deref() {
                    MediaRepository::adjust_item_count(&txn, new, 1).await?;
                }
            }

            let rows = MediaRepository::find_group(&txn, group_key).await?;
            txn.commit().await?;
            Ok(rows)
        }
        .await;

        let rows = match outcome {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    owner_id = ?old_owner_id,
                    group_key = %group_key,
                    operation = "reassign",
                    "Reassignment not persisted, moving files back: {}",
                    e
                );
                for (row, path, moved) in &placements {
                    if *moved
                        && let Err(move_err) = self.store.move_to(path, &row.storage_path).await
                    {
                        tracing::error!(
                            "Failed to restore {} to {}: {}",
                            path,
                            row.storage_path,
                            move_err
                        );
                    }
                }
                return Err(e);
            }
        };

        self.invalidate().await;
        self.audit
            .log(
                AuditEventType::MediaMove,
                Some(actor_id.to_string()),
                Some(group_key.to_string()),
                "reassign_owner",
                "success",
                Some(json!({ "from": old_owner_id, "to": new_owner_id })),
            )
            .await;

        Ok(rows)
    }
}
