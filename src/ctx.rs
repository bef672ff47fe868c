use crate::error::{Error, Result};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Per-request identity, recomputed on every request from the
/// Authorization header. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedIdentity {
    Authenticated { user_id: String },
    Anonymous,
}

impl ResolvedIdentity {
    /// Strict variant for operations with no public form.
    pub fn require_authenticated(&self) -> Result<&str> {
        match self {
            ResolvedIdentity::Authenticated { user_id } => Ok(user_id),
            ResolvedIdentity::Anonymous => Err(Error::Unauthenticated),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, ResolvedIdentity::Authenticated { .. })
    }
}

/// Extractor for handlers that require an authenticated caller.
/// Fails closed with 401 when the resolved identity is anonymous.
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: String,
}

impl Ctx {
    pub fn new(user_id: String) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let identity = parts
            .extensions
            .get::<ResolvedIdentity>()
            .ok_or_else(|| Error::Internal("identity resolver not applied".to_string()))?;

        let user_id = identity.require_authenticated()?;
        Ok(Ctx::new(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_fails_closed() {
        let identity = ResolvedIdentity::Anonymous;
        assert_eq!(
            identity.require_authenticated(),
            Err(Error::Unauthenticated)
        );
    }

    #[test]
    fn authenticated_yields_subject() {
        let identity = ResolvedIdentity::Authenticated {
            user_id: "u-1".to_string(),
        };
        assert_eq!(identity.require_authenticated(), Ok("u-1"));
    }
}
