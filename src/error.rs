use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Unified error taxonomy shared by the REST and GraphQL surfaces.
///
/// Display output is the client-facing message; `Internal` hides its
/// detail there, so it only ever reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed input (bad email, short password, short title, ...).
    #[error("{0}")]
    Validation(String),
    /// Login failure. Deliberately carries no detail about which part
    /// of the credential was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// No valid identity attached to the request.
    #[error("Not authenticated")]
    Unauthenticated,
    /// Valid identity, but not the owner of the target resource.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::InvalidCredentials => "invalid_credentials",
            Error::Unauthenticated => "unauthenticated",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::Internal(detail) = &self {
            error!("internal error: {}", detail);
        }

        let body = Json(json!({
            "error": {
                "message": self.message(),
                "code": self.code(),
            }
        }));

        (self.status(), body).into_response()
    }
}

// Collaborator failures demote to Internal unless already classified.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_message_hides_detail() {
        let err = Error::Internal("sqlite connection refused".to_string());
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(err.code(), "internal");
    }

    #[test]
    fn credential_failures_share_one_shape() {
        // Unknown email and wrong password must be indistinguishable.
        assert_eq!(Error::InvalidCredentials, Error::InvalidCredentials);
        assert_eq!(Error::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    }
}
