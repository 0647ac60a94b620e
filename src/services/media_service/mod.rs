use crate::api::error::AppError;
use crate::entities::{galleries, prelude::*};
use crate::services::audit::AuditService;
use crate::services::cache::{CacheVersionGate, scopes};
use crate::services::variant_deriver::VariantPolicy;
use crate::services::variant_store::VariantStore;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};

pub mod cover;
pub mod create;
pub mod delete;
pub mod details;
pub mod reassign;
pub mod replace;
pub mod types;

pub use types::{MediaUpdate, NewMediaGroup, ReplaceMedia};

/// Owns the lifecycle of variant groups: create, replace, move, delete and cover
/// selection. Files are written before rows and cleaned up if the rows never land.
#[derive(Clone)]
pub struct MediaService {
    db: DatabaseConnection,
    store: VariantStore,
    policy: VariantPolicy,
    cache: CacheVersionGate,
    audit: AuditService,
}

impl MediaService {
    pub fn new(
        db: DatabaseConnection,
        store: VariantStore,
        policy: VariantPolicy,
        cache: CacheVersionGate,
    ) -> Self {
        let audit = AuditService::new(db.clone());
        Self {
            db,
            store,
            policy,
            cache,
            audit,
        }
    }

    pub fn store(&self) -> &VariantStore {
        &self.store
    }

    /// Media changes show up in gallery covers and counts too
    async fn invalidate(&self) {
        self.cache
            .bump_all(&[scopes::MEDIA, scopes::GALLERIES])
            .await;
    }
}

/// Fails with a `gallery_id` field error unless the gallery exists and is not deleted
pub(crate) async fn ensure_owner(
    db: &impl ConnectionTrait,
    owner_id: Option<&str>,
) -> Result<(), AppError> {
    let Some(owner_id) = owner_id else {
        return Ok(());
    };
    let exists = Galleries::find_by_id(owner_id.to_string())
        .filter(galleries::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .is_some();
    if !exists {
        return Err(AppError::field("gallery_id", "Gallery does not exist"));
    }
    Ok(())
}
