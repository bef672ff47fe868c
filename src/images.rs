//! Image attachment storage
//!
//! Uploaded files are content-addressed: the stored name is the sha256
//! of the bytes plus the original extension, so re-uploads of the same
//! image dedupe naturally.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::{AppState, FeedConfig};
use crate::ctx::Ctx;
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
pub struct ImageUploaded {
    pub image_url: String,
}

/// POST /images - requires auth, multipart field `image`
pub async fn upload_image(
    State(state): State<AppState>,
    ctx: Ctx,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageUploaded>)> {
    info!("POST /images - by {}", ctx.user_id());

    let mut filename = None;
    let mut data: Option<bytes::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Bad multipart payload: {}", e)))?
    {
        if field.name() == Some("image") {
            filename = field.file_name().map(|s| s.to_string());
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("Failed to read image: {}", e)))?,
            );
        }
    }

    let data = data.ok_or_else(|| Error::Validation("Image upload is required".to_string()))?;
    if data.is_empty() {
        return Err(Error::Validation("Image upload is required".to_string()));
    }

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let hash = format!("{:x}", hasher.finalize());

    let name = match filename.as_deref().and_then(extension) {
        Some(ext) => format!("{}.{}", hash, ext),
        None => hash,
    };

    let path = state.config.images_dir.join(&name);
    let size = data.len();
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| Error::Internal(format!("Failed to store image: {}", e)))?;

    info!("Stored image {} ({} bytes)", name, size);

    Ok((
        StatusCode::CREATED,
        Json(ImageUploaded {
            image_url: format!("images/{}", name),
        }),
    ))
}

/// GET /images/{name} - public
pub async fn serve_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(HeaderMap, Vec<u8>)> {
    if is_unsafe_name(&name) {
        return Err(Error::NotFound("No such image".to_string()));
    }

    let path = state.config.images_dir.join(&name);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| Error::NotFound("No such image".to_string()))?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_type_for(&name).parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }

    Ok((headers, data))
}

/// Remove a stored image, given the `images/<name>` url recorded on a
/// post. Best-effort; failures are logged, never surfaced.
pub async fn clear_image(config: &FeedConfig, image_url: &str) {
    let name = image_url.strip_prefix("images/").unwrap_or(image_url);
    if is_unsafe_name(name) {
        return;
    }

    let path = config.images_dir.join(name);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!("Failed to remove image {}: {}", name, e);
    }
}

/// Stored names are flat; anything that could escape the images
/// directory is rejected by serving and cleanup alike.
fn is_unsafe_name(name: &str) -> bool {
    name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..")
}

fn extension(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ok = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then_some(ext)
}

fn content_type_for(name: &str) -> &'static str {
    match extension(name) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
