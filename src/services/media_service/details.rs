use super::{MediaService, MediaUpdate};
use crate::api::error::AppError;
use crate::entities::media_variants;
use crate::services::audit::AuditEventType;
use crate::services::media_repository::MediaRepository;
use crate::services::tag_service::TagService;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};

impl MediaService {
    /// Group-wide alt text, sort order and tag replacement. `None` leaves a field alone.
    pub async fn update_details(
        &self,
        group_key: &str,
        alt_text: Option<String>,
        sort_order: Option<i32>,
        tags: Option<Vec<String>>,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        if MediaRepository::find_group(&self.db, group_key).await?.is_empty() {
            return Err(AppError::NotFound("Media not found".to_string()));
        }
        if alt_text.is_none() && sort_order.is_none() && tags.is_none() {
            return Ok(MediaRepository::find_group(&self.db, group_key).await?);
        }

        let txn = self.db.begin().await?;
        if let Some(alt_text) = alt_text {
            let alt_text = Some(alt_text).filter(|a| !a.trim().is_empty());
            MediaRepository::set_alt_text(&txn, group_key, alt_text).await?;
        }
        if let Some(sort_order) = sort_order {
            crate::entities::prelude::MediaVariants::update_many()
                .col_expr(media_variants::Column::SortOrder, Expr::value(sort_order))
                .filter(media_variants::Column::GroupKey.eq(group_key))
                .exec(&txn)
                .await?;
        }
        if let Some(tags) = tags {
            TagService::sync_media_tags(&txn, group_key, &tags).await?;
        }
        let rows = MediaRepository::find_group(&txn, group_key).await?;
        txn.commit().await?;

        self.invalidate().await;
        self.audit
            .log(
                AuditEventType::MediaUpdate,
                Some(actor_id.to_string()),
                Some(group_key.to_string()),
                "update_details",
                "success",
                None,
            )
            .await;

        Ok(rows)
    }

    /// Applies a combined edit to the group containing `media_id`.
    /// Replacement runs first since it produces a new group key.
    pub async fn update_media(
        &self,
        media_id: &str,
        update: MediaUpdate,
        actor_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        let group = MediaRepository::find_group_of(&self.db, media_id).await?;
        let mut group_key = group
            .first()
            .map(|row| row.group_key.clone())
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

        let mut replaced_alt = false;
        if let Some(replacement) = update.replacement {
            replaced_alt = replacement.alt_text.is_some();
            let rows = self.replace_group(&group_key, replacement, actor_id).await?;
            if let Some(row) = rows.first() {
                group_key = row.group_key.clone();
            }
        }

        if let Some(owner_id) = update.owner_id {
            self.reassign_owner(&group_key, owner_id, actor_id).await?;
        }

        let alt_text = if replaced_alt { None } else { update.alt_text };
        self.update_details(&group_key, alt_text, update.sort_order, update.tags, actor_id)
            .await
    }

    pub async fn get_group(&self, media_id: &str) -> Result<Vec<media_variants::Model>, AppError> {
        MediaRepository::find_group_of(&self.db, media_id).await
    }
}
