pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::cache::CacheVersionGate;
use crate::services::catalog::GalleryCatalog;
use crate::services::gallery_service::GalleryService;
use crate::services::media_service::MediaService;
use crate::services::storage::StorageService;
use crate::services::variant_store::VariantStore;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::galleries::list_galleries,
        api::handlers::galleries::get_gallery,
        api::handlers::galleries::create_gallery,
        api::handlers::galleries::update_gallery,
        api::handlers::galleries::delete_gallery,
        api::handlers::galleries::set_gallery_cover,
        api::handlers::media::list_media,
        api::handlers::media::get_media,
        api::handlers::media::upload_media,
        api::handlers::media::update_media,
        api::handlers::media::delete_media,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            entities::media_variants::VariantKind,
            entities::media_variants::MediaOrigin,
            models::MessageResponse,
            models::TagView,
            models::MediaVariantView,
            models::CoverView,
            models::GallerySummary,
            models::MediaGroupView,
            models::GalleryDetail,
            models::MediaItem,
            models::GalleryListResponse,
            models::MediaListResponse,
            models::GalleryEnvelope,
            models::MediaGroupEnvelope,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "galleries", description = "Gallery catalog and cover management"),
        (name = "media", description = "Image upload, variants and media library"),
        (name = "system", description = "Health endpoints")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub media_service: Arc<MediaService>,
    pub gallery_service: Arc<GalleryService>,
    pub catalog: Arc<GalleryCatalog>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services over one database, one storage backend and one cache
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        let store = VariantStore::new(storage.clone());
        let cache = CacheVersionGate::in_memory(Duration::from_secs(config.cache_ttl_secs));

        let media = MediaService::new(
            db.clone(),
            store.clone(),
            config.variant_policy(),
            cache.clone(),
        );
        let gallery_service = GalleryService::new(db.clone(), media.clone(), cache.clone());
        let catalog = GalleryCatalog::new(db.clone(), store, cache);

        Self {
            db,
            storage,
            media_service: Arc::new(media),
            gallery_service: Arc::new(gallery_service),
            catalog: Arc::new(catalog),
            config,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    use api::handlers::{galleries, media};

    let protected = Router::new()
        .route(
            "/galleries",
            get(galleries::list_galleries).post(galleries::create_gallery),
        )
        .route(
            "/galleries/:id",
            get(galleries::get_gallery)
                .put(galleries::update_gallery)
                .delete(galleries::delete_gallery),
        )
        .route(
            "/galleries/:id/media/:media_id/cover",
            post(galleries::set_gallery_cover),
        )
        .route("/media", get(media::list_media).post(media::upload_media))
        .route(
            "/media/:id",
            get(media::get_media)
                .put(media::update_media)
                .delete(media::delete_media),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .merge(protected);

    if state.config.storage_backend == "local" {
        app = app.nest_service("/storage", ServeDir::new(&state.config.local_storage_root));
    }

    app.layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_upload_size + MULTIPART_OVERHEAD,
        ))
        .with_state(state)
}
