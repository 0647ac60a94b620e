#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use gallery_backend::config::AppConfig;
use gallery_backend::entities::categories;
use gallery_backend::infrastructure::database;
use gallery_backend::services::storage::StorageService;
use gallery_backend::utils::auth::create_jwt;
use gallery_backend::{AppState, create_app};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";
pub const ACTOR: &str = "admin-1";

/// One connection so every query sees the same in-memory database
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

#[derive(Default)]
pub struct MockStorageService {
    files: Mutex<HashMap<String, Vec<u8>>>,
    /// Uploads left before every further upload fails
    uploads_before_failure: Mutex<Option<usize>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }

    /// Lets `count` more uploads through, then fails the rest
    pub fn fail_uploads_after(&self, count: usize) {
        *self.uploads_before_failure.lock().unwrap() = Some(count);
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        if let Some(left) = self.uploads_before_failure.lock().unwrap().as_mut() {
            if *left == 0 {
                anyhow::bail!("Storage unavailable");
            }
            *left -= 1;
        }
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_file(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("Key not found"))
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn move_object(&self, source_key: &str, dest_key: &str) -> anyhow::Result<()> {
        let mut files = self.files.lock().unwrap();
        let data = files
            .remove(source_key)
            .ok_or_else(|| anyhow::anyhow!("Source key not found"))?;
        files.insert(dest_key.to_string(), data);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.contains(key))
    }

    async fn file_size(&self, key: &str) -> anyhow::Result<u64> {
        self.get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| anyhow::anyhow!("Key not found"))
    }

    async fn make_directory(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://mock-storage/{}", key)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        storage_backend: "memory".to_string(),
        ..AppConfig::development()
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub storage: Arc<MockStorageService>,
    pub state: AppState,
}

pub async fn setup_app() -> TestApp {
    let db = setup_test_db().await;
    let storage = Arc::new(MockStorageService::new());
    let state = AppState::new(db.clone(), storage.clone(), test_config());
    TestApp { db, storage, state }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        create_app(self.state.clone()).oneshot(req).await.unwrap()
    }
}

pub async fn seed_category(db: &DatabaseConnection, name: &str) -> categories::Model {
    categories::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        slug: Set(name.to_lowercase()),
        parent_id: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {}", create_jwt(ACTOR, JWT_SECRET).unwrap())
}

/// Left half red, right half blue
pub fn split_image(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([220, 20, 20])
        } else {
            Rgb([20, 20, 220])
        }
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    split_image(width, height, ImageOutputFormat::Jpeg(90))
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    split_image(width, height, ImageOutputFormat::Png)
}

pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).unwrap()
}

pub fn is_red(px: Rgb<u8>) -> bool {
    px[0] > 150 && px[2] < 100
}

pub fn is_blue(px: Rgb<u8>) -> bool {
    px[2] > 150 && px[0] < 100
}

const BOUNDARY: &str = "----gallery-test-boundary";

#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, method: &str, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", bearer())
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn authed(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", bearer())
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
