use crate::services::variant_deriver::VariantPolicy;
use std::env;
use std::str::FromStr;

/// Runtime configuration for the gallery backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum accepted upload size in bytes (default: 5 MB)
    pub max_upload_size: usize,

    /// JWT secret used to verify actor tokens (Required in production)
    pub jwt_secret: String,

    /// Storage backend: "local" or "s3" (default: "local")
    pub storage_backend: String,

    /// Root directory for the local storage backend (default: "./storage")
    pub local_storage_root: String,

    /// Base URL used when building public URLs for stored variants
    pub public_base_url: String,

    /// Large variant box (default: 1200x900)
    pub large_size: (u32, u32),

    /// Thumbnail variant box (default: 400x300)
    pub thumbnail_size: (u32, u32),

    /// JPEG quality for resized variants (default: 90)
    pub image_quality: u8,

    /// Lifetime of cached catalog responses in seconds (default: 3600)
    pub cache_ttl_secs: u64,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 5 * 1024 * 1024, // 5 MB
            jwt_secret: "secret".to_string(),
            storage_backend: "local".to_string(),
            local_storage_root: "./storage".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            large_size: (1200, 900),
            thumbnail_size: (400, 300),
            image_quality: 90,
            cache_ttl_secs: 3600,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: parse_env("MAX_UPLOAD_SIZE", default.max_upload_size),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            storage_backend: env::var("STORAGE_BACKEND")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.storage_backend),
            local_storage_root: env::var("LOCAL_STORAGE_ROOT")
                .unwrap_or(default.local_storage_root),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(default.public_base_url),
            large_size: (
                parse_env("LARGE_WIDTH", default.large_size.0),
                parse_env("LARGE_HEIGHT", default.large_size.1),
            ),
            thumbnail_size: (
                parse_env("THUMB_WIDTH", default.thumbnail_size.0),
                parse_env("THUMB_HEIGHT", default.thumbnail_size.1),
            ),
            image_quality: parse_env("IMAGE_QUALITY", default.image_quality).clamp(1, 100),
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", default.cache_ttl_secs),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (local storage, short cache lifetime)
    pub fn development() -> Self {
        Self {
            cache_ttl_secs: 60,
            ..Self::default()
        }
    }

    /// Create config for production (JWT secret must come from the environment)
    pub fn production() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("CRITICAL: JWT_SECRET must be set"))?;
        Ok(Self {
            jwt_secret,
            ..Self::from_env()
        })
    }

    /// Variant sizes and encoding quality applied to every upload
    pub fn variant_policy(&self) -> VariantPolicy {
        VariantPolicy {
            large: self.large_size,
            thumbnail: self.thumbnail_size,
            quality: self.image_quality,
        }
    }
}
