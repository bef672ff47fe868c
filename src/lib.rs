//! feedhub - blog/feed backend
//!
//! One axum server exposing the same user/post data model twice: a REST
//! surface under /auth and /feed, and a GraphQL surface at /graphql,
//! plus a WebSocket live-update feed.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod error;
pub mod graphql;
pub mod guard;
pub mod images;
pub mod live;
pub mod posts;

use axum::{
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::middleware::mw_resolve_identity;
use auth::token::TokenCodec;
use auth::AuthManager;
use config::{AppState, FeedConfig};
use live::FeedEvents;
use posts::PostStore;

/// Build the application router for the given state.
pub fn app(state: AppState) -> Router {
    let schema = graphql::build_schema(state.clone());

    Router::new()
        // Auth
        .route("/auth/signup", put(auth::handlers::signup))
        .route("/auth/login", post(auth::handlers::login))
        .route("/auth/me", get(auth::handlers::me))
        // Feed (REST)
        .route("/feed/posts", get(posts::handlers::list_posts))
        .route("/feed/post", post(posts::handlers::create_post))
        .route(
            "/feed/post/{post_id}",
            get(posts::handlers::get_post)
                .put(posts::handlers::update_post)
                .delete(posts::handlers::delete_post),
        )
        // Live updates
        .route("/feed/live", get(live::feed_live))
        // Image attachments
        .route("/images", post(images::upload_image))
        .route("/images/{name}", get(images::serve_image))
        // GraphQL
        .route("/graphql", post(graphql::graphql_handler))
        // Health check
        .route("/health", get(health_check))
        .layer(Extension(schema))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw_resolve_identity,
        ))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire up state from config: pool, codec, managers, event channel.
pub async fn build_state(config: FeedConfig) -> anyhow::Result<AppState> {
    config.ensure_dirs().await?;

    let pool = config::open_pool(&config).await?;
    let codec = Arc::new(TokenCodec::from_config(&config));
    let auth = Arc::new(AuthManager::new(pool.clone(), codec.clone(), config.token_ttl_secs).await?);
    let posts = Arc::new(PostStore::new(pool).await?);
    let events = FeedEvents::new(64);

    Ok(AppState {
        config,
        auth,
        posts,
        codec,
        events,
    })
}

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feedhub=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    let config = FeedConfig::default();
    info!("=== feedhub ===");
    info!("Storage directory: {:?}", config.base_dir);
    info!("Database: {:?}", config.db_path);

    let state = build_state(config).await?;
    let port = state.config.port;
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK - feedhub"
}
