use crate::api::error::AppError;
use crate::entities::media_variants::{self, VariantKind};
use crate::entities::{galleries, prelude::*};
use crate::models::{
    CoverView, GalleryDetail, GalleryListResponse, GallerySummary, MediaGroupView, MediaItem,
    MediaListResponse, MediaVariantView, tag_views,
};
use crate::services::cache::{CacheVersionGate, scopes};
use crate::services::media_repository::MediaRepository;
use crate::services::tag_service::TagService;
use crate::services::variant_store::VariantStore;
use chrono::{NaiveDate, TimeDelta};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, ItemsAndPagesNumber, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use utoipa::IntoParams;

pub const DEFAULT_PER_PAGE: u64 = 15;
pub const MAX_PER_PAGE: u64 = 100;

const KIB: i64 = 1024;
const SMALL_LIMIT: i64 = 500 * KIB;
const MEDIUM_LIMIT: i64 = 2 * 1024 * KIB;

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GalleryFilters {
    /// Case-insensitive match on title and description
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MediaFilters {
    /// Case-insensitive match on file name and alt text
    pub search: Option<String>,
    pub gallery_id: Option<String>,
    pub category_id: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub date_from: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub date_to: Option<String>,
    /// File extension; `jpg` and `jpeg` are interchangeable
    pub file_type: Option<String>,
    /// `small` (< 500 KiB), `medium` (500 KiB to 2 MiB) or `large` (> 2 MiB)
    pub size_range: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRange {
    Small,
    Medium,
    Large,
}

impl SizeRange {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(AppError::field(
                "size_range",
                "size_range must be one of small, medium, large",
            )),
        }
    }

    fn condition(&self) -> Condition {
        let column = media_variants::Column::ByteSize;
        match self {
            Self::Small => Condition::all().add(column.lt(SMALL_LIMIT)),
            Self::Medium => Condition::all().add(column.between(SMALL_LIMIT, MEDIUM_LIMIT)),
            Self::Large => Condition::all().add(column.gt(MEDIUM_LIMIT)),
        }
    }
}

/// Returns `(page, per_page)` with page >= 1 and per_page in [1, 100]
pub fn page_window(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page.unwrap_or(1).max(1), per_page)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.to_lowercase())
}

fn lower_like(column: impl sea_orm::sea_query::IntoColumnRef, pattern: &str) -> Condition {
    Condition::all().add(Expr::expr(Func::lower(Expr::col(column))).like(pattern))
}

fn parse_day(field: &'static str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::field(field, format!("{} must be a date (YYYY-MM-DD)", field)))
}

/// Extension aliases matched for a `file_type` filter
pub fn extension_aliases(file_type: &str) -> Vec<String> {
    let normalized = file_type.trim().trim_start_matches('.').to_lowercase();
    match normalized.as_str() {
        "jpg" | "jpeg" => vec!["jpg".to_string(), "jpeg".to_string()],
        _ => vec![normalized],
    }
}

/// Read side of galleries and media. List and detail responses are cached under
/// versioned keys and invalidated by scope bumps from the write services.
#[derive(Clone)]
pub struct GalleryCatalog {
    db: DatabaseConnection,
    store: VariantStore,
    cache: CacheVersionGate,
}

impl GalleryCatalog {
    pub fn new(db: DatabaseConnection, store: VariantStore, cache: CacheVersionGate) -> Self {
        Self { db, store, cache }
    }

    pub async fn paginate(&self, filters: GalleryFilters) -> Result<GalleryListResponse, AppError> {
        let (page, per_page) = page_window(filters.page, filters.per_page);
        let params = json!({
            "list": "galleries",
            "search": non_empty(&filters.search),
            "category_id": non_empty(&filters.category_id),
            "page": page,
            "per_page": per_page,
        });
        let key = self.cache.versioned_key(scopes::GALLERIES, &params).await?;
        self.cache
            .remember(&key, move || self.load_gallery_page(filters, page, per_page))
            .await
    }

    async fn load_gallery_page(
        &self,
        filters: GalleryFilters,
        page: u64,
        per_page: u64,
    ) -> Result<GalleryListResponse, AppError> {
        let mut condition = Condition::all().add(galleries::Column::DeletedAt.is_null());
        if let Some(search) = non_empty(&filters.search) {
            let pattern = like_pattern(&search);
            condition = condition.add(
                Condition::any()
                    .add(lower_like(galleries::Column::Title, &pattern))
                    .add(lower_like(galleries::Column::Description, &pattern)),
            );
        }
        if let Some(category_id) = non_empty(&filters.category_id) {
            condition = condition.add(galleries::Column::CategoryId.eq(category_id));
        }

        let paginator = Galleries::find()
            .filter(condition)
            .order_by_desc(galleries::Column::CreatedAt)
            .order_by_desc(galleries::Column::Id)
            .paginate(&self.db, per_page);
        let ItemsAndPagesNumber {
            number_of_items,
            number_of_pages,
        } = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(GalleryListResponse {
            galleries: self.summaries(items).await?,
            total: number_of_items,
            per_page,
            current_page: page,
            total_pages: number_of_pages,
        })
    }

    async fn summaries(
        &self,
        items: Vec<galleries::Model>,
    ) -> Result<Vec<GallerySummary>, AppError> {
        let ids: Vec<String> = items.iter().map(|g| g.id.clone()).collect();
        let mut covers = MediaRepository::selected_covers(&self.db, ids.clone()).await?;
        let mut tags = TagService::tags_for_galleries(&self.db, ids).await?;

        Ok(items
            .into_iter()
            .map(|gallery| {
                let cover = covers
                    .remove(&gallery.id)
                    .and_then(|group| CoverView::from_group(&group, &self.store));
                let tags = tag_views(tags.remove(&gallery.id));
                GallerySummary::new(gallery, cover, tags)
            })
            .collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<GalleryDetail, AppError> {
        let key = self
            .cache
            .versioned_key(scopes::GALLERIES, &json!({ "id": id }))
            .await?;
        self.cache.remember(&key, move || self.load_detail(id)).await
    }

    /// Uncached detail read, used after writes
    pub async fn load_detail(&self, id: &str) -> Result<GalleryDetail, AppError> {
        let gallery = Galleries::find_by_id(id.to_string())
            .filter(galleries::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Gallery not found".to_string()))?;

        let groups = MediaRepository::groups_for_owner(&self.db, id).await?;
        let keys: Vec<String> = groups
            .iter()
            .filter_map(|g| g.first().map(|row| row.group_key.clone()))
            .collect();
        let mut group_tags = TagService::tags_for_groups(&self.db, keys).await?;

        let cover = groups
            .iter()
            .find(|group| group.iter().any(|row| row.is_selected_cover))
            .and_then(|group| CoverView::from_group(group, &self.store));
        let tags = tag_views(
            TagService::tags_for_galleries(&self.db, vec![gallery.id.clone()])
                .await?
                .remove(&gallery.id),
        );

        let media = groups
            .into_iter()
            .filter_map(|group| {
                let key = group.first()?.group_key.clone();
                MediaGroupView::from_group(group, tag_views(group_tags.remove(&key)), &self.store)
            })
            .collect();

        Ok(GalleryDetail {
            summary: GallerySummary::new(gallery, cover, tags),
            media,
        })
    }

    pub async fn paginate_media(&self, filters: MediaFilters) -> Result<MediaListResponse, AppError> {
        let (page, per_page) = page_window(filters.page, filters.per_page);
        let condition = media_condition(&filters)?;
        let params = json!({
            "list": "media",
            "search": non_empty(&filters.search),
            "gallery_id": non_empty(&filters.gallery_id),
            "category_id": non_empty(&filters.category_id),
            "date_from": non_empty(&filters.date_from),
            "date_to": non_empty(&filters.date_to),
            "file_type": non_empty(&filters.file_type),
            "size_range": non_empty(&filters.size_range),
            "page": page,
            "per_page": per_page,
        });
        let key = self.cache.versioned_key(scopes::MEDIA, &params).await?;
        self.cache
            .remember(&key, move || self.load_media_page(condition, page, per_page))
            .await
    }

    async fn load_media_page(
        &self,
        condition: Condition,
        page: u64,
        per_page: u64,
    ) -> Result<MediaListResponse, AppError> {
        let paginator = MediaVariants::find()
            .filter(condition)
            .order_by_desc(media_variants::Column::UploadedAt)
            .order_by_desc(media_variants::Column::Id)
            .paginate(&self.db, per_page);
        let ItemsAndPagesNumber {
            number_of_items,
            number_of_pages,
        } = paginator.num_items_and_pages().await?;
        let originals = paginator.fetch_page(page - 1).await?;

        let keys: Vec<String> = originals.iter().map(|row| row.group_key.clone()).collect();
        let mut siblings: HashMap<String, Vec<media_variants::Model>> =
            MediaRepository::find_groups(&self.db, keys.clone())
                .await?
                .into_iter()
                .filter_map(|group| Some((group.first()?.group_key.clone(), group)))
                .collect();
        let mut group_tags = TagService::tags_for_groups(&self.db, keys).await?;

        let media = originals
            .into_iter()
            .map(|original| {
                let group = siblings.remove(&original.group_key).unwrap_or_default();
                let tags = tag_views(group_tags.remove(&original.group_key));
                MediaItem::new(original, &group, tags, &self.store)
            })
            .collect();

        Ok(MediaListResponse {
            media,
            total: number_of_items,
            per_page,
            current_page: page,
            total_pages: number_of_pages,
        })
    }

    pub async fn get_media_group(&self, media_id: &str) -> Result<Vec<MediaVariantView>, AppError> {
        let key = self
            .cache
            .versioned_key(scopes::MEDIA, &json!({ "id": media_id }))
            .await?;
        self.cache
            .remember(&key, move || async move {
                let group = MediaRepository::find_group_of(&self.db, media_id).await?;
                Ok(MediaVariantView::from_group(group, &self.store))
            })
            .await
    }
}

/// Original variants only; resized siblings are attached per row
fn media_condition(filters: &MediaFilters) -> Result<Condition, AppError> {
    use media_variants::Column;

    let mut condition = Condition::all().add(Column::VariantKind.eq(VariantKind::Original));

    if let Some(search) = non_empty(&filters.search) {
        let pattern = like_pattern(&search);
        condition = condition.add(
            Condition::any()
                .add(lower_like(Column::OriginalName, &pattern))
                .add(lower_like(Column::AltText, &pattern)),
        );
    }
    if let Some(gallery_id) = non_empty(&filters.gallery_id) {
        condition = condition.add(Column::OwnerId.eq(gallery_id));
    }
    if let Some(category_id) = non_empty(&filters.category_id) {
        condition = condition.add(
            Column::OwnerId.in_subquery(
                Query::select()
                    .column(galleries::Column::Id)
                    .from(galleries::Entity)
                    .and_where(galleries::Column::CategoryId.eq(category_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(from) = non_empty(&filters.date_from) {
        let day = parse_day("date_from", &from)?;
        condition = condition.add(Column::UploadedAt.gte(day.and_time(Default::default()).and_utc()));
    }
    if let Some(to) = non_empty(&filters.date_to) {
        let next_day = parse_day("date_to", &to)? + TimeDelta::days(1);
        condition =
            condition.add(Column::UploadedAt.lt(next_day.and_time(Default::default()).and_utc()));
    }
    if let Some(file_type) = non_empty(&filters.file_type) {
        condition = condition.add(
            Expr::expr(Func::lower(Expr::col(Column::Extension)))
                .is_in(extension_aliases(&file_type)),
        );
    }
    if let Some(size_range) = non_empty(&filters.size_range) {
        condition = condition.add(SizeRange::parse(&size_range)?.condition());
    }

    Ok(condition)
}
