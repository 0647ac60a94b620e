use super::MediaService;
use crate::api::error::AppError;
use crate::entities::media_variants::MediaOrigin;
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use crate::services::tag_service::TagService;
use sea_orm::TransactionTrait;

impl MediaService {
    /// Removes every file of the group, then its rows and tag links
    pub async fn delete_group(&self, group_key: &str, actor_id: &str) -> Result<(), AppError> {
        let group = MediaRepository::find_group(&self.db, group_key).await?;
        let first = group
            .first()
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
        let owner_id = first.owner_id.clone();
        let origin = first.origin;

        let paths: Vec<String> = group.iter().map(|row| row.storage_path.clone()).collect();
        self.store.discard_all(&paths).await;

        let txn = self.db.begin().await?;
        TagService::delete_media_tags(&txn, group_key).await?;
        MediaRepository::delete_group(&txn, group_key).await?;
        if origin == MediaOrigin::Standalone
            && let Some(owner) = owner_id.as_deref()
        {
            MediaRepository::adjust_item_count(&txn, owner, -1).await?;
        }
        txn.commit().await?;

        self.invalidate().await;
        tracing::info!("🗑️ Media group {} deleted", group_key);
        self.audit
            .log(
                AuditEventType::MediaDelete,
                Some(actor_id.to_string()),
                Some(group_key.to_string()),
                "delete_group",
                "success",
                None,
            )
            .await;

        Ok(())
    }
}
