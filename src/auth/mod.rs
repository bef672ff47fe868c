//! Authentication module
//!
//! Handles user signup and login against the SQLite user store and
//! issues identity tokens on successful credential checks.

pub mod handlers;
pub mod middleware;
pub mod token;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use token::TokenCodec;

const MIN_PASSWORD_LEN: usize = 5;
const DEFAULT_STATUS: &str = "I am new!";

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Public user info (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

/// Successful login outcome
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: String,
}

pub struct AuthManager {
    pool: SqlitePool,
    codec: Arc<TokenCodec>,
    token_ttl_secs: i64,
}

impl AuthManager {
    pub async fn new(
        pool: SqlitePool,
        codec: Arc<TokenCodec>,
        token_ttl_secs: i64,
    ) -> Result<Self> {
        let manager = Self {
            pool,
            codec,
            token_ttl_secs,
        };
        manager.init_db().await?;
        Ok(manager)
    }

    /// Create the users table. Email uniqueness is enforced here, at the
    /// store level; there is no racy pre-insert duplicate check.
    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Register a new user. Stores a one-way hash of the password,
    /// never the plaintext.
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> Result<UserInfo> {
        validate_signup(email, name, password)?;

        // Hashing is CPU-bound; keep it off the request-handling path.
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .map_err(|e| Error::Internal(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.trim().to_string(),
            password_hash,
            status: DEFAULT_STATUS.to_string(),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.status)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(err) = inserted {
            // The UNIQUE constraint is the sole duplicate authority.
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return Err(Error::Validation(format!(
                    "Email {} already exists",
                    user.email
                )));
            }
            return Err(err.into());
        }

        info!("[Auth] User registered: {} ({})", user.name, user.email);

        Ok(user.into())
    }

    /// Verify credentials and issue a token (1 hour TTL by default).
    ///
    /// Missing user and password mismatch both return the identical
    /// `InvalidCredentials` value so callers cannot tell which part of
    /// the credential was wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((user_id, email, password_hash)) = row else {
            warn!("[Auth] Failed login attempt");
            return Err(Error::InvalidCredentials);
        };

        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify(password, &password_hash))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .map_err(|e| Error::Internal(e.to_string()))?;

        if !valid {
            warn!("[Auth] Failed login attempt");
            return Err(Error::InvalidCredentials);
        }

        let token = self
            .codec
            .issue(&user_id, &email, self.token_ttl_secs)
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("[Auth] User logged in: {}", user_id);

        Ok(LoginOutcome { token, user_id })
    }

    /// Look up a user by id. A resolved identity does not guarantee the
    /// record still exists; callers acting on one must fail closed.
    pub async fn get_user(&self, user_id: &str) -> Result<UserInfo> {
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, name, status, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, email, name, status, created_at)) = row else {
            return Err(Error::NotFound("User not found".to_string()));
        };

        Ok(UserInfo {
            id,
            email,
            name,
            status,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        })
    }
}

fn validate_signup(email: &str, name: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("Name is required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(Error::Validation("Valid email is required".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password minimum {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("long.local+tag@sub.domain.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a x@x.com"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("a@.com"));
    }

    #[test]
    fn signup_input_rules() {
        assert!(validate_signup("a@x.com", "Ann", "pass1").is_ok());
        assert!(matches!(
            validate_signup("a@x.com", "   ", "pass1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_signup("not-an-email", "Ann", "pass1"),
            Err(Error::Validation(_))
        ));
        // Minimum is 5 characters.
        assert!(matches!(
            validate_signup("a@x.com", "Ann", "pass"),
            Err(Error::Validation(_))
        ));
        assert!(validate_signup("a@x.com", "Ann", "12345").is_ok());
    }
}
