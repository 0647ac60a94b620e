use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Rendition of an upload. Pixel boxes for `Large` and `Thumbnail` come from the
/// configured `VariantPolicy`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    #[sea_orm(string_value = "original")]
    Original,
    #[sea_orm(string_value = "large")]
    Large,
    #[sea_orm(string_value = "thumbnail")]
    Thumbnail,
}

impl VariantKind {
    /// Folder segment used in storage paths
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Large => "large",
            Self::Thumbnail => "thumbnail",
        }
    }

    /// Whether this kind may ever represent a gallery cover
    pub fn is_cover_candidate(&self) -> bool {
        matches!(self, Self::Large | Self::Thumbnail)
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::Original => 0,
            Self::Large => 1,
            Self::Thumbnail => 2,
        }
    }
}

/// How a group entered the system. Only standalone groups count towards
/// a gallery's `item_count`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum MediaOrigin {
    #[sea_orm(string_value = "cover")]
    Cover,
    #[sea_orm(string_value = "standalone")]
    Standalone,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: Option<String>,
    pub group_key: String,
    pub variant_kind: VariantKind,
    pub origin: MediaOrigin,
    pub storage_path: String,
    pub original_name: Option<String>,
    pub extension: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub width: i32,
    pub height: i32,
    pub is_cover_candidate: bool,
    pub is_selected_cover: bool,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub uploaded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::galleries::Entity",
        from = "Column::OwnerId",
        to = "super::galleries::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Galleries,
}

impl Related<super::galleries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Galleries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
