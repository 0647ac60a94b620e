use super::MediaService;
use crate::api::error::AppError;
use crate::entities::{galleries, media_variants, prelude::*};
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};

impl MediaService {
    /// Makes the group containing `media_id` the gallery's cover. The previous
    /// selection is cleared in the same transaction; concurrent calls resolve
    /// last-write-wins.
    pub async fn set_selected_cover(
        &self,
        owner_id: &str,
        media_id: &str,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        Galleries::find_by_id(owner_id.to_string())
            .filter(galleries::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Gallery not found".to_string()))?;

        let group = MediaRepository::find_group_of(&self.db, media_id).await?;
        let group_key = match group.first() {
            Some(row) if row.owner_id.as_deref() == Some(owner_id) => row.group_key.clone(),
            _ => {
                return Err(AppError::NotFound(
                    "Media not found in this gallery".to_string(),
                ));
            }
        };

        let txn = self.db.begin().await?;
        MediaRepository::clear_selected_cover(&txn, owner_id).await?;
        MediaRepository::select_cover(&txn, &group_key).await?;
        let rows = MediaRepository::find_group(&txn, &group_key).await?;
        txn.commit().await?;

        self.invalidate().await;
        tracing::info!("🖼️ Gallery {} cover set to group {}", owner_id, group_key);
        self.audit
            .log(
                AuditEventType::CoverSelect,
                Some(actor_id.to_string()),
                Some(owner_id.to_string()),
                "set_selected_cover",
                "success",
                Some(serde_json::json!({ "group_key": group_key })),
            )
            .await;

        Ok(rows)
    }
}
