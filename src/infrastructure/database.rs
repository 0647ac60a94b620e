use crate::entities::{
    audit_logs, categories, galleries, gallery_tags, media_tags, media_variants, tags,
};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: categories -> galleries -> media_variants, tags -> links
    let stmts = vec![
        (
            "categories",
            schema
                .create_table_from_entity(categories::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "galleries",
            schema
                .create_table_from_entity(galleries::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "tags",
            schema
                .create_table_from_entity(tags::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "gallery_tags",
            schema
                .create_table_from_entity(gallery_tags::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "media_variants",
            schema
                .create_table_from_entity(media_variants::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "media_tags",
            schema
                .create_table_from_entity(media_tags::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "audit_logs",
            schema
                .create_table_from_entity(audit_logs::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        match db.execute(stmt).await {
            Ok(_) => info!("   - Table '{}' checked/created", name),
            Err(e) => tracing::warn!("   - Failed to create table '{}': {}", name, e),
        }
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_media_variants_group_key ON media_variants(group_key)",
        "CREATE INDEX IF NOT EXISTS idx_media_variants_owner_id ON media_variants(owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_media_variants_uploaded_at ON media_variants(uploaded_at)",
        "CREATE INDEX IF NOT EXISTS idx_galleries_created_at ON galleries(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_galleries_deleted_at ON galleries(deleted_at)",
        "CREATE INDEX IF NOT EXISTS idx_media_tags_tag_id ON media_tags(tag_id)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => tracing::debug!("   - Index checked: {}", query),
            Err(e) => tracing::warn!("   - Index creation warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
