use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "galleries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub is_active: bool,
    pub is_public: bool,
    #[sea_orm(default_value = 0)]
    pub item_count: i32,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Categories,
    #[sea_orm(has_many = "super::media_variants::Entity")]
    MediaVariants,
    #[sea_orm(has_many = "super::gallery_tags::Entity")]
    GalleryTags,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::media_variants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaVariants.def()
    }
}

impl Related<super::gallery_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GalleryTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
