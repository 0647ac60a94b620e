use crate::api::error::AppError;
use crate::entities::{galleries, media_variants, prelude::*};
use media_variants::{Column, MediaOrigin, VariantKind};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;

/// Row access for `media_variants`. Every group-level operation filters on `group_key`.
pub struct MediaRepository;

/// Splits rows into groups, keeping first-seen group order and sorting each
/// group original, large, thumbnail.
pub fn group_rows(rows: Vec<media_variants::Model>) -> Vec<Vec<media_variants::Model>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<media_variants::Model>> = HashMap::new();
    for row in rows {
        if !groups.contains_key(&row.group_key) {
            order.push(row.group_key.clone());
        }
        groups.entry(row.group_key.clone()).or_default().push(row);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|mut group| {
            group.sort_by_key(|row| row.variant_kind.rank());
            group
        })
        .collect()
}

impl MediaRepository {
    pub async fn insert_group(
        db: &impl ConnectionTrait,
        rows: Vec<media_variants::ActiveModel>,
    ) -> Result<Vec<media_variants::Model>, DbErr> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            inserted.push(row.insert(db).await?);
        }
        inserted.sort_by_key(|row| row.variant_kind.rank());
        Ok(inserted)
    }

    pub async fn find_by_id(
        db: &impl ConnectionTrait,
        id: &str,
    ) -> Result<Option<media_variants::Model>, DbErr> {
        MediaVariants::find_by_id(id.to_string()).one(db).await
    }

    pub async fn find_group(
        db: &impl ConnectionTrait,
        group_key: &str,
    ) -> Result<Vec<media_variants::Model>, DbErr> {
        let mut rows = MediaVariants::find()
            .filter(Column::GroupKey.eq(group_key))
            .all(db)
            .await?;
        rows.sort_by_key(|row| row.variant_kind.rank());
        Ok(rows)
    }

    /// Resolves any variant id to its full group
    pub async fn find_group_of(
        db: &impl ConnectionTrait,
        media_id: &str,
    ) -> Result<Vec<media_variants::Model>, AppError> {
        let row = Self::find_by_id(db, media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
        Ok(Self::find_group(db, &row.group_key).await?)
    }

    /// All groups owned by a gallery, in display order
    pub async fn groups_for_owner(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<Vec<Vec<media_variants::Model>>, DbErr> {
        let rows = MediaVariants::find()
            .filter(Column::OwnerId.eq(owner_id))
            .order_by_asc(Column::SortOrder)
            .order_by_asc(Column::UploadedAt)
            .all(db)
            .await?;
        Ok(group_rows(rows))
    }

    /// Rows of every group whose key is in `group_keys`
    pub async fn find_groups(
        db: &impl ConnectionTrait,
        group_keys: Vec<String>,
    ) -> Result<Vec<Vec<media_variants::Model>>, DbErr> {
        if group_keys.is_empty() {
            return Ok(Vec::new());
        }
        let rows = MediaVariants::find()
            .filter(Column::GroupKey.is_in(group_keys))
            .all(db)
            .await?;
        Ok(group_rows(rows))
    }

    pub async fn delete_group(db: &impl ConnectionTrait, group_key: &str) -> Result<u64, DbErr> {
        let res = MediaVariants::delete_many()
            .filter(Column::GroupKey.eq(group_key))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn set_alt_text(
        db: &impl ConnectionTrait,
        group_key: &str,
        alt_text: Option<String>,
    ) -> Result<u64, DbErr> {
        let res = MediaVariants::update_many()
            .col_expr(Column::AltText, Expr::value(alt_text))
            .filter(Column::GroupKey.eq(group_key))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn clear_selected_cover(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<u64, DbErr> {
        let res = MediaVariants::update_many()
            .col_expr(Column::IsSelectedCover, Expr::value(false))
            .filter(Column::OwnerId.eq(owner_id))
            .filter(Column::IsSelectedCover.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Marks the group's large variant as the selected cover. Callers clear the
    /// owner's previous selection first.
    pub async fn select_cover(db: &impl ConnectionTrait, group_key: &str) -> Result<(), AppError> {
        let res = MediaVariants::update_many()
            .col_expr(Column::IsSelectedCover, Expr::value(true))
            .filter(Column::GroupKey.eq(group_key))
            .filter(Column::VariantKind.eq(VariantKind::Large))
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Media group has no cover candidate".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn selected_cover_group(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<Option<String>, DbErr> {
        let row = MediaVariants::find()
            .filter(Column::OwnerId.eq(owner_id))
            .filter(Column::IsSelectedCover.eq(true))
            .one(db)
            .await?;
        Ok(row.map(|r| r.group_key))
    }

    /// Group uploaded as the owner's gallery cover, whether or not it is selected
    pub async fn cover_origin_group(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<Option<String>, DbErr> {
        let row = MediaVariants::find()
            .filter(Column::OwnerId.eq(owner_id))
            .filter(Column::Origin.eq(MediaOrigin::Cover))
            .order_by_desc(Column::UploadedAt)
            .one(db)
            .await?;
        Ok(row.map(|r| r.group_key))
    }

    /// Selects a cover for an owner that lost its selection: the cover-origin group
    /// when there is one, otherwise the first group in display order.
    pub async fn select_fallback_cover(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<Option<String>, AppError> {
        let group_key = match Self::cover_origin_group(db, owner_id).await? {
            Some(key) => Some(key),
            None => Self::groups_for_owner(db, owner_id)
                .await?
                .into_iter()
                .next()
                .and_then(|group| group.first().map(|row| row.group_key.clone())),
        };
        if let Some(key) = &group_key {
            Self::select_cover(db, key).await?;
        }
        Ok(group_key)
    }

    pub async fn has_selected_cover(
        db: &impl ConnectionTrait,
        owner_id: &str,
    ) -> Result<bool, DbErr> {
        Ok(Self::selected_cover_group(db, owner_id).await?.is_some())
    }

    /// Selected cover group per owner, keyed by owner id
    pub async fn selected_covers(
        db: &impl ConnectionTrait,
        owner_ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<media_variants::Model>>, DbErr> {
        if owner_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let selected = MediaVariants::find()
            .filter(Column::OwnerId.is_in(owner_ids))
            .filter(Column::IsSelectedCover.eq(true))
            .all(db)
            .await?;
        let keys: Vec<String> = selected.iter().map(|r| r.group_key.clone()).collect();

        let mut covers = HashMap::new();
        for group in Self::find_groups(db, keys).await? {
            if let Some(owner) = group.first().and_then(|r| r.owner_id.clone()) {
                covers.insert(owner, group);
            }
        }
        Ok(covers)
    }

    /// Adds `delta` to a gallery's `item_count`; decrements never go below zero
    pub async fn adjust_item_count(
        db: &impl ConnectionTrait,
        gallery_id: &str,
        delta: i32,
    ) -> Result<(), DbErr> {
        let mut update = Galleries::update_many()
            .col_expr(
                galleries::Column::ItemCount,
                Expr::col(galleries::Column::ItemCount).add(delta),
            )
            .filter(galleries::Column::Id.eq(gallery_id));
        if delta < 0 {
            update = update.filter(galleries::Column::ItemCount.gte(-delta));
        }
        update.exec(db).await?;
        Ok(())
    }
}
