//! Feed server configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

use crate::auth::token::TokenCodec;
use crate::auth::AuthManager;
use crate::live::FeedEvents;
use crate::posts::PostStore;

/// Configuration for the feed server
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Base storage directory (database + uploaded images)
    pub base_dir: PathBuf,
    /// Uploaded image directory
    pub images_dir: PathBuf,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Listen port
    pub port: u16,
    /// Page size for post listings, shared by both API surfaces
    pub posts_per_page: u32,
    /// Token lifetime in seconds
    pub token_ttl_secs: i64,
    /// Active signing secret
    pub jwt_secret: String,
    /// Retired secret still honored during verification (rotation window)
    pub jwt_secret_previous: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let base = std::env::var("FEEDHUB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("feedhub_data"));

        let jwt_secret = std::env::var("FEEDHUB_JWT_SECRET").unwrap_or_else(|_| {
            // Tokens will not survive a restart without a configured secret.
            warn!("FEEDHUB_JWT_SECRET not set, using a random per-process secret");
            uuid::Uuid::new_v4().to_string()
        });

        Self {
            images_dir: base.join("images"),
            db_path: base.join("feed.sqlite"),
            base_dir: base,
            port: std::env::var("FEEDHUB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            posts_per_page: std::env::var("FEEDHUB_POSTS_PER_PAGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            token_ttl_secs: 3600,
            jwt_secret,
            jwt_secret_previous: std::env::var("FEEDHUB_JWT_SECRET_PREVIOUS").ok(),
        }
    }
}

impl FeedConfig {
    /// Create config rooted at a custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        let base = base_dir.into();
        config.images_dir = base.join("images");
        config.db_path = base.join("feed.sqlite");
        config.base_dir = base;
        config
    }

    /// Ensure all storage directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        tokio::fs::create_dir_all(&self.images_dir).await?;
        Ok(())
    }
}

/// Open the shared SQLite pool, creating the database file if missing.
pub async fn open_pool(config: &FeedConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!(
        "sqlite://{}",
        config.db_path.to_string_lossy().replace('\\', "/")
    ))?
    .create_if_missing(true);
    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: FeedConfig,
    pub auth: Arc<AuthManager>,
    pub posts: Arc<PostStore>,
    pub codec: Arc<TokenCodec>,
    pub events: FeedEvents,
}
