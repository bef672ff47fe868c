use crate::auth::token::TokenCodec;
use crate::config::AppState;
use crate::ctx::ResolvedIdentity;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Resolve the caller's identity from the Authorization header and
/// attach it to the request extensions.
///
/// Deliberately non-rejecting: the GraphQL surface funnels public and
/// protected operations through one entry point, so a missing or bad
/// token maps to `Anonymous` and each operation decides for itself.
pub async fn mw_resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    debug!("MIDDLEWARE: resolve_identity");

    let identity = resolve(req.headers().get(header::AUTHORIZATION), &state.codec);
    req.extensions_mut().insert(identity);

    next.run(req).await
}

fn resolve(auth_header: Option<&HeaderValue>, codec: &TokenCodec) -> ResolvedIdentity {
    let Some(value) = auth_header.and_then(|h| h.to_str().ok()) else {
        return ResolvedIdentity::Anonymous;
    };

    // Format: "Bearer <token>"
    let Some(token) = value.strip_prefix("Bearer ") else {
        return ResolvedIdentity::Anonymous;
    };

    match codec.verify(token) {
        Some(claims) => ResolvedIdentity::Authenticated {
            user_id: claims.sub,
        },
        None => ResolvedIdentity::Anonymous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_malformed_headers_resolve_anonymous() {
        let codec = TokenCodec::new("test-secret", None);

        assert_eq!(resolve(None, &codec), ResolvedIdentity::Anonymous);

        let bare = HeaderValue::from_static("some-token");
        assert_eq!(resolve(Some(&bare), &codec), ResolvedIdentity::Anonymous);

        let wrong_scheme = HeaderValue::from_static("Basic dXNlcjpwdw==");
        assert_eq!(
            resolve(Some(&wrong_scheme), &codec),
            ResolvedIdentity::Anonymous
        );

        let garbage = HeaderValue::from_static("Bearer not.a.token");
        assert_eq!(resolve(Some(&garbage), &codec), ResolvedIdentity::Anonymous);
    }

    #[test]
    fn valid_token_resolves_authenticated() {
        let codec = TokenCodec::new("test-secret", None);
        let token = codec.issue("u-7", "a@x.com", 3600).unwrap();

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        assert_eq!(
            resolve(Some(&header), &codec),
            ResolvedIdentity::Authenticated {
                user_id: "u-7".to_string()
            }
        );
    }
}
