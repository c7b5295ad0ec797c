//! Admin claim assignment.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::instrument;

use emporium_core::backend::{BackendError, IdentityAdmin};
use emporium_core::{Claims, Uid};

/// Change to a user's admin claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimAction {
    Promote,
    Demote,
}

#[derive(Debug, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl ClaimAction {
    /// Value of the `admin` claim after the action.
    #[must_use]
    pub const fn grants_admin(self) -> bool {
        matches!(self, Self::Promote)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }
}

impl fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promote" => Ok(Self::Promote),
            "demote" => Ok(Self::Demote),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Set `{admin: true|false}` as the user's custom claims.
///
/// Takes effect on the user's next token refresh.
///
/// # Errors
///
/// Returns the identity service's error, `BackendError::NotFound` for an
/// unknown uid.
#[instrument(skip(identity), fields(uid = %uid, action = %action))]
pub async fn apply_claim_action(
    identity: &dyn IdentityAdmin,
    uid: &Uid,
    action: ClaimAction,
) -> Result<(), BackendError> {
    identity
        .set_custom_claims(uid, &Claims::with_admin(action.grants_admin()))
        .await?;
    tracing::info!("Admin claim updated");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::Email;
    use emporium_core::backend::IdentityProvider;
    use emporium_storefront::memory::MemoryBackend;

    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("promote".parse::<ClaimAction>().unwrap(), ClaimAction::Promote);
        assert_eq!("demote".parse::<ClaimAction>().unwrap(), ClaimAction::Demote);
        assert!("Promote".parse::<ClaimAction>().is_err());
    }

    #[tokio::test]
    async fn test_promote_then_demote() {
        let backend = MemoryBackend::new();
        let session = backend
            .sign_up(&Email::parse("ola@example.com").unwrap(), "Sklep123!")
            .await
            .unwrap();
        let uid = session.identity.uid.clone();

        apply_claim_action(&backend, &uid, ClaimAction::Promote).await.unwrap();
        let refreshed = backend.refresh(&session).await.unwrap();
        assert!(refreshed.identity.claims.is_admin());

        apply_claim_action(&backend, &uid, ClaimAction::Demote).await.unwrap();
        let refreshed = backend.refresh(&refreshed).await.unwrap();
        assert!(!refreshed.identity.claims.is_admin());
    }

    #[tokio::test]
    async fn test_unknown_uid() {
        let backend = MemoryBackend::new();
        let err = apply_claim_action(&backend, &Uid::new("ghost"), ClaimAction::Promote)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }
}
