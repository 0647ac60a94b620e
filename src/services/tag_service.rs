use crate::entities::{gallery_tags, media_tags, prelude::*, tags};
use crate::utils::slug::slugify;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Tag lookup and association for galleries and media groups
pub struct TagService;

impl TagService {
    /// Finds a tag by the slug of `name`, creating it when missing.
    /// Names that slugify to nothing are ignored.
    pub async fn get_or_create(
        db: &impl ConnectionTrait,
        name: &str,
    ) -> Result<Option<tags::Model>, DbErr> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Ok(None);
        }

        if let Some(existing) = Tags::find()
            .filter(tags::Column::Slug.eq(&slug))
            .one(db)
            .await?
        {
            return Ok(Some(existing));
        }

        let tag = tags::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            slug: Set(slug),
        }
        .insert(db)
        .await?;
        Ok(Some(tag))
    }

    async fn resolve_all(
        db: &impl ConnectionTrait,
        names: &[String],
    ) -> Result<Vec<tags::Model>, DbErr> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for name in names {
            if let Some(tag) = Self::get_or_create(db, name).await?
                && seen.insert(tag.id.clone())
            {
                resolved.push(tag);
            }
        }
        Ok(resolved)
    }

    /// Replaces the gallery's tag links with `names`
    pub async fn sync_gallery_tags(
        db: &impl ConnectionTrait,
        gallery_id: &str,
        names: &[String],
    ) -> Result<Vec<tags::Model>, DbErr> {
        GalleryTags::delete_many()
            .filter(gallery_tags::Column::GalleryId.eq(gallery_id))
            .exec(db)
            .await?;

        let resolved = Self::resolve_all(db, names).await?;
        for tag in &resolved {
            GalleryTags::insert(gallery_tags::ActiveModel {
                gallery_id: Set(gallery_id.to_string()),
                tag_id: Set(tag.id.clone()),
            })
            .exec_without_returning(db)
            .await?;
        }
        Ok(resolved)
    }

    /// Replaces the media group's tag links with `names`
    pub async fn sync_media_tags(
        db: &impl ConnectionTrait,
        group_key: &str,
        names: &[String],
    ) -> Result<Vec<tags::Model>, DbErr> {
        Self::delete_media_tags(db, group_key).await?;

        let resolved = Self::resolve_all(db, names).await?;
        for tag in &resolved {
            MediaTags::insert(media_tags::ActiveModel {
                group_key: Set(group_key.to_string()),
                tag_id: Set(tag.id.clone()),
            })
            .exec_without_returning(db)
            .await?;
        }
        Ok(resolved)
    }

    pub async fn move_media_tags(
        db: &impl ConnectionTrait,
        from_group_key: &str,
        to_group_key: &str,
    ) -> Result<(), DbErr> {
        MediaTags::update_many()
            .col_expr(media_tags::Column::GroupKey, Expr::value(to_group_key))
            .filter(media_tags::Column::GroupKey.eq(from_group_key))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn delete_media_tags(db: &impl ConnectionTrait, group_key: &str) -> Result<(), DbErr> {
        MediaTags::delete_many()
            .filter(media_tags::Column::GroupKey.eq(group_key))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn tags_by_id(
        db: &impl ConnectionTrait,
        ids: Vec<String>,
    ) -> Result<HashMap<String, tags::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let found = Tags::find()
            .filter(tags::Column::Id.is_in(ids))
            .order_by_asc(tags::Column::Name)
            .all(db)
            .await?;
        Ok(found.into_iter().map(|t| (t.id.clone(), t)).collect())
    }

    pub async fn tags_for_galleries(
        db: &impl ConnectionTrait,
        gallery_ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<tags::Model>>, DbErr> {
        if gallery_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let links = GalleryTags::find()
            .filter(gallery_tags::Column::GalleryId.is_in(gallery_ids))
            .all(db)
            .await?;
        let by_id = Self::tags_by_id(db, links.iter().map(|l| l.tag_id.clone()).collect()).await?;

        let mut result: HashMap<String, Vec<tags::Model>> = HashMap::new();
        for link in links {
            if let Some(tag) = by_id.get(&link.tag_id) {
                result.entry(link.gallery_id).or_default().push(tag.clone());
            }
        }
        for tags in result.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(result)
    }

    pub async fn tags_for_groups(
        db: &impl ConnectionTrait,
        group_keys: Vec<String>,
    ) -> Result<HashMap<String, Vec<tags::Model>>, DbErr> {
        if group_keys.is_empty() {
            return Ok(HashMap::new());
        }
        let links = MediaTags::find()
            .filter(media_tags::Column::GroupKey.is_in(group_keys))
            .all(db)
            .await?;
        let by_id = Self::tags_by_id(db, links.iter().map(|l| l.tag_id.clone()).collect()).await?;

        let mut result: HashMap<String, Vec<tags::Model>> = HashMap::new();
        for link in links {
            if let Some(tag) = by_id.get(&link.tag_id) {
                result.entry(link.group_key).or_default().push(tag.clone());
            }
        }
        for tags in result.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(result)
    }
}
