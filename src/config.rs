use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_PAGE_SIZE: u64 = 12;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub media_dir: String,
    pub database_url: String,
    /// Externally visible origin used to build media URLs. Defaults to
    /// `http://{host}:{port}`.
    pub public_base_url: String,
    pub max_upload_bytes: u64,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image gallery API")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded binaries are stored (overrides GALLERY_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Database URL (overrides GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public base URL for media links (overrides GALLERY_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Per-file upload ceiling in bytes (overrides GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env_var("GALLERY_PORT", 3000)?;
        let env_media = env::var("GALLERY_MEDIA_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_db = env::var("GALLERY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/gallery.db".into());
        let env_public_base = env::var("GALLERY_PUBLIC_BASE_URL").ok();
        let env_max_upload = parse_env_var("GALLERY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let default_page_size = parse_env_var("GALLERY_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_env_var("GALLERY_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or(env_public_base)
            .unwrap_or_else(|| format!("http://{}:{}", host, port));

        let cfg = Self {
            host,
            port,
            media_dir: args.media_dir.unwrap_or(env_media),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            default_page_size,
            max_page_size,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).context(format!("reading {}", name)),
    }
}
