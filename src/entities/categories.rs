use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category tree rows. Maintained by the category admin; this service only reads them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub parent_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::galleries::Entity")]
    Galleries,
}

impl Related<super::galleries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Galleries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
