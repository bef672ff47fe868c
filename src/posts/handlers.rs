//! REST feed handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppState;
use crate::ctx::{Ctx, ResolvedIdentity};
use crate::error::{Error, Result};
use crate::guard::authorize_mutation;
use crate::images;
use crate::live::FeedEvent;

use super::{Post, PostInput};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
    pub total_items: i64,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PostBody {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

/// GET /feed/posts?page=N - public
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostListResponse>> {
    let page = query.page.unwrap_or(1);
    info!("GET /feed/posts - page {}", page);

    let (posts, total_items) = state
        .posts
        .list_page(page, state.config.posts_per_page)
        .await?;

    Ok(Json(PostListResponse { posts, total_items }))
}

/// GET /feed/post/{post_id} - public
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    info!("GET /feed/post/{}", post_id);

    let post = state
        .posts
        .find(&post_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No post found matching id {}", post_id)))?;

    Ok(Json(PostResponse { post }))
}

/// POST /feed/post - requires auth
pub async fn create_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(body): Json<PostBody>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    info!("POST /feed/post - by {}", ctx.user_id());

    // The token may outlive the user record; creation needs a live
    // creator. Update/delete stay id-only so orphaned posts remain
    // guarded (see guard::authorize_mutation).
    state
        .auth
        .get_user(ctx.user_id())
        .await
        .map_err(|_| Error::Unauthenticated)?;

    let input = PostInput::parse(&body.title, &body.content, &body.image_url)?;
    let post = state.posts.create(input, ctx.user_id()).await?;

    state.events.emit(FeedEvent::Created { post: post.clone() });

    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

/// PUT /feed/post/{post_id} - requires auth + ownership
pub async fn update_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(post_id): Path<String>,
    Json(body): Json<PostBody>,
) -> Result<Json<PostResponse>> {
    info!("PUT /feed/post/{} - by {}", post_id, ctx.user_id());

    let input = PostInput::parse(&body.title, &body.content, &body.image_url)?;

    let existing = state
        .posts
        .find(&post_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No post matching id {}", post_id)))?;

    let identity = ResolvedIdentity::Authenticated {
        user_id: ctx.user_id().to_string(),
    };
    authorize_mutation(&identity, &existing.creator.id)?;

    // A new image replaces the stored file.
    if input.image_url != existing.image_url {
        images::clear_image(&state.config, &existing.image_url).await;
    }

    let post = state.posts.update(&post_id, input).await?;

    state.events.emit(FeedEvent::Updated { post: post.clone() });

    Ok(Json(PostResponse { post }))
}

/// DELETE /feed/post/{post_id} - requires auth + ownership
pub async fn delete_post(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(post_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    info!("DELETE /feed/post/{} - by {}", post_id, ctx.user_id());

    let existing = state
        .posts
        .find(&post_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No post matching id {}", post_id)))?;

    let identity = ResolvedIdentity::Authenticated {
        user_id: ctx.user_id().to_string(),
    };
    authorize_mutation(&identity, &existing.creator.id)?;

    images::clear_image(&state.config, &existing.image_url).await;
    state.posts.remove(&post_id).await?;

    state.events.emit(FeedEvent::Deleted { post_id });

    Ok(Json(MessageResponse {
        message: "Post deleted".to_string(),
    }))
}
