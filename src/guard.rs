//! Ownership guard for mutating operations on posts.
//!
//! Transport-agnostic: both the REST and GraphQL surfaces call this
//! before executing an update or delete.

use crate::ctx::ResolvedIdentity;
use crate::error::{Error, Result};

/// Decide allow/deny for a mutation on a resource owned by `owner_id`.
///
/// Comparison is by id equality only; whether the owner record still
/// exists in the user store is irrelevant, so orphaned resources stay
/// protected.
pub fn authorize_mutation(identity: &ResolvedIdentity, owner_id: &str) -> Result<()> {
    match identity {
        ResolvedIdentity::Anonymous => Err(Error::Unauthenticated),
        ResolvedIdentity::Authenticated { user_id } if user_id != owner_id => Err(
            Error::Forbidden("Not allowed to modify this post".to_string()),
        ),
        ResolvedIdentity::Authenticated { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed(id: &str) -> ResolvedIdentity {
        ResolvedIdentity::Authenticated {
            user_id: id.to_string(),
        }
    }

    #[test]
    fn owner_is_allowed() {
        assert!(authorize_mutation(&authed("u-1"), "u-1").is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let err = authorize_mutation(&authed("u-2"), "u-1").unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        let err = authorize_mutation(&ResolvedIdentity::Anonymous, "u-1").unwrap_err();
        assert_eq!(err, Error::Unauthenticated);
    }

    #[test]
    fn orphaned_owner_still_protected() {
        // The owner id does not have to resolve to a live user record.
        let err = authorize_mutation(&authed("u-2"), "deleted-user").unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
