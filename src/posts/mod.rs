//! Post model and store
//!
//! Posts carry an immutable `creator_id` set at creation time; update
//! operations never touch it.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Creator info embedded in post responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: Creator,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New or updated post content, already validated
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

const MIN_TITLE_LEN: usize = 7;

impl PostInput {
    /// Trim and validate raw input.
    pub fn parse(title: &str, content: &str, image_url: &str) -> Result<Self> {
        let title = title.trim();
        let content = content.trim();
        if title.len() < MIN_TITLE_LEN {
            return Err(Error::Validation(format!(
                "Title must be at least {} characters",
                MIN_TITLE_LEN
            )));
        }
        if content.is_empty() {
            return Err(Error::Validation("Content must not be empty".to_string()));
        }
        if image_url.is_empty() {
            return Err(Error::Validation("No image given for this post".to_string()));
        }
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
            image_url: image_url.to_string(),
        })
    }
}

type PostRow = (
    String,         // id
    String,         // title
    String,         // content
    String,         // image_url
    String,         // creator_id
    Option<String>, // creator name, absent when the owner record is gone
    String,         // created_at
    String,         // updated_at
);

fn row_to_post(row: PostRow) -> Post {
    let (id, title, content, image_url, creator_id, creator_name, created_at, updated_at) = row;
    Post {
        id,
        title,
        content,
        image_url,
        creator: Creator {
            id: creator_id,
            name: creator_name.unwrap_or_default(),
        },
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    }
}

const SELECT_POST: &str = "SELECT p.id, p.title, p.content, p.image_url, p.creator_id, u.name, \
     p.created_at, p.updated_at \
     FROM posts p LEFT JOIN users u ON u.id = p.creator_id";

pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                image_url TEXT NOT NULL,
                creator_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create(&self, input: PostInput, creator_id: &str) -> Result<Post> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO posts (id, title, content, image_url, creator_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(creator_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("[Feed] Post {} created by {}", id, creator_id);

        self.find(&id)
            .await?
            .ok_or_else(|| Error::Internal("post vanished after insert".to_string()))
    }

    pub async fn find(&self, id: &str) -> Result<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(&format!("{} WHERE p.id = ?", SELECT_POST))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_post))
    }

    /// Newest-first page of posts plus the total count. Pages are 1-based.
    pub async fn list_page(&self, page: u32, per_page: u32) -> Result<(Vec<Post>, i64)> {
        let page = page.max(1);

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        // Offset arithmetic in i64, saturating: a huge page number is a
        // valid request for an empty page, never a wrapped offset.
        let offset = (page as i64 - 1).saturating_mul(per_page as i64);

        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "{} ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
            SELECT_POST
        ))
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(row_to_post).collect(), total))
    }

    /// Rewrite title/content/image of an existing post. `creator_id`
    /// is never reassigned.
    pub async fn update(&self, id: &str, input: PostInput) -> Result<Post> {
        sqlx::query(
            "UPDATE posts SET title = ?, content = ?, image_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No post matching id {}", id)))
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!("[Feed] Post {} deleted", id);
        Ok(())
    }
}
