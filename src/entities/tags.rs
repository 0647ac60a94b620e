use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gallery_tags::Entity")]
    GalleryTags,
    #[sea_orm(has_many = "super::media_tags::Entity")]
    MediaTags,
}

impl Related<super::gallery_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GalleryTags.def()
    }
}

impl Related<super::media_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
