//! Token codec: signed, time-limited identity assertions.
//!
//! HS256 over a shared secret. Verification is all-or-nothing; any
//! malformed, tampered, or expired token resolves to `None`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;

/// Identity assertion carried by a token. Immutable once issued;
/// expiry is the only lifecycle end (no revocation list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id
    pub sub: String,
    pub email: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expires-at, unix seconds
    pub exp: i64,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    /// Active key first, then any retired key still in its rotation window.
    decoding: Vec<DecodingKey>,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, previous_secret: Option<&str>) -> Self {
        let mut decoding = vec![DecodingKey::from_secret(secret.as_bytes())];
        if let Some(previous) = previous_secret {
            decoding.push(DecodingKey::from_secret(previous.as_bytes()));
        }

        // Zero leeway: a token is invalid the moment now > exp.
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding,
            validation,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_secret_previous.as_deref())
    }

    /// Issue a signed token asserting `subject_id`/`email` for `ttl_secs`.
    pub fn issue(
        &self,
        subject_id: &str,
        email: &str,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Check signature integrity and expiry. Returns `None` for a
    /// malformed token, a signature mismatch, or an expired assertion.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        for key in &self.decoding {
            if let Ok(data) = decode::<Claims>(token, key, &self.validation) {
                return Some(data.claims);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_subject_and_email() {
        let codec = TokenCodec::new("test-secret", None);
        let token = codec.issue("user-42", "ann@example.com", 3600).unwrap();

        let claims = codec.verify(&token).expect("fresh token must verify");
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.email, "ann@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn round_trip_for_ascii_emails_and_ids() {
        let codec = TokenCodec::new("test-secret", None);
        for (id, email) in [
            ("1", "a@x.com"),
            ("0000-1111", "long.local+tag@sub.domain.org"),
            ("user id with spaces", "UPPER@CASE.COM"),
        ] {
            let token = codec.issue(id, email, 1).unwrap();
            let claims = codec.verify(&token).unwrap();
            assert_eq!(claims.sub, id);
            assert_eq!(claims.email, email);
        }
    }

    #[test]
    fn malformed_token_is_invalid() {
        let codec = TokenCodec::new("test-secret", None);
        assert!(codec.verify("").is_none());
        assert!(codec.verify("not-a-token").is_none());
        assert!(codec.verify("a.b.c").is_none());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let issuer = TokenCodec::new("secret-a", None);
        let verifier = TokenCodec::new("secret-b", None);
        let token = issuer.issue("u-1", "a@x.com", 3600).unwrap();
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn expired_token_is_invalid() {
        let codec = TokenCodec::new("test-secret", None);

        // Craft an already-expired assertion with the same signing key.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u-1".to_string(),
            email: "a@x.com".to_string(),
            iat: now - 7200,
            exp: now - 1,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn valid_at_exactly_the_expiry_boundary() {
        let codec = TokenCodec::new("test-secret", None);

        // A token is invalid once now > exp, so at exactly exp it still
        // verifies. Re-craft if the wall clock ticks mid-check.
        for _ in 0..5 {
            let now = Utc::now().timestamp();
            let claims = Claims {
                sub: "u-1".to_string(),
                email: "a@x.com".to_string(),
                iat: now - 3600,
                exp: now,
            };
            let token = encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(b"test-secret"),
            )
            .unwrap();

            let verified = codec.verify(&token);
            if Utc::now().timestamp() == now {
                assert!(verified.is_some(), "token must verify at exp == now");
                return;
            }
        }
        panic!("clock kept crossing the boundary mid-check");
    }

    #[test]
    fn valid_strictly_before_expiry() {
        let codec = TokenCodec::new("test-secret", None);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u-1".to_string(),
            email: "a@x.com".to_string(),
            iat: now,
            exp: now + 5,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(codec.verify(&token).is_some());
    }

    #[test]
    fn previous_secret_honored_during_rotation() {
        let old = TokenCodec::new("old-secret", None);
        let token = old.issue("u-1", "a@x.com", 3600).unwrap();

        let rotated = TokenCodec::new("new-secret", Some("old-secret"));
        let claims = rotated.verify(&token).expect("rotation window must hold");
        assert_eq!(claims.sub, "u-1");

        // New issuance uses the new secret only.
        let fresh = rotated.issue("u-2", "b@x.com", 3600).unwrap();
        assert!(old.verify(&fresh).is_none());
    }
}
