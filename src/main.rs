use anyhow::Result;
use axum::Router;
use gallery::{
    config::AppConfig,
    routes,
    services::{
        gallery_service::GalleryService, image_index::ImageIndex, media_store::MediaStore,
    },
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate_only) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting gallery with config: {:?}", cfg);

    // --- Ensure media directory exists ---
    if !Path::new(&cfg.media_dir).exists() {
        fs::create_dir_all(&cfg.media_dir)?;
        tracing::info!("Created media directory at {}", cfg.media_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");

    // SQLx will not create the database file or its directory on its own
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    if let Err(e) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(db_path)
    {
        tracing::warn!("Failed to pre-create database file {}: {}", db_path, e);
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Apply migrations (and exit if that is all we were asked to do) ---
    sqlx::migrate!("./migrations").run(&*db).await?;
    if migrate_only {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize core service ---
    let index = ImageIndex::new(db.clone());
    let media = MediaStore::new(cfg.media_dir.clone(), cfg.public_base_url.clone());
    let service = GalleryService::new(index, media, cfg.default_page_size, cfg.max_page_size);

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes as usize).with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
