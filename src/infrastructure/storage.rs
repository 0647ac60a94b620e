use crate::config::AppConfig;
use crate::services::local_storage::LocalStorageService;
use crate::services::storage::{S3StorageService, StorageService};
use anyhow::{Context, Result, bail};
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> Result<Arc<dyn StorageService>> {
    match config.storage_backend.as_str() {
        "local" => {
            tokio::fs::create_dir_all(&config.local_storage_root)
                .await
                .with_context(|| {
                    format!("creating storage root {}", config.local_storage_root)
                })?;
            info!("💾 Local Storage: {}", config.local_storage_root);
            Ok(Arc::new(LocalStorageService::new(
                &config.local_storage_root,
                config.public_base_url.clone(),
            )))
        }
        "s3" => Ok(Arc::new(setup_s3(config.public_base_url.clone()).await?)),
        other => bail!("Unknown STORAGE_BACKEND '{}' (expected local or s3)", other),
    }
}

async fn setup_s3(default_public_url: String) -> Result<S3StorageService> {
    let endpoint_url = env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT must be set")?;
    let access_key = env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY must be set")?;
    let secret_key = env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY must be set")?;
    let bucket = env::var("MINIO_BUCKET").context("MINIO_BUCKET must be set")?;
    let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let public_base_url = env::var("MINIO_PUBLIC_URL").unwrap_or(default_public_url);

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(region))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // Create the bucket on first start; an existing bucket is fine
    if let Err(e) = s3_client.create_bucket().bucket(&bucket).send().await {
        tracing::debug!("Bucket {} not created (may already exist): {:?}", bucket, e);
    }

    Ok(S3StorageService::new(s3_client, bucket, public_base_url))
}
