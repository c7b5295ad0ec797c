//! Admin claim commands.

use emporium_admin::services::{ClaimAction, apply_claim_action};
use emporium_core::Uid;
use emporium_core::backend::IdentityAdmin;

use super::CommandError;

/// Promote or demote `uid`. The user sees the change after their next token
/// refresh.
pub async fn set_claim(
    identity: &dyn IdentityAdmin,
    uid: &str,
    action: ClaimAction,
) -> Result<(), CommandError> {
    let uid = uid.trim();
    if uid.is_empty() {
        return Err(CommandError::EmptyUid);
    }
    apply_claim_action(identity, &Uid::new(uid), action).await?;
    tracing::info!(uid, %action, "Done");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::Email;
    use emporium_core::backend::IdentityProvider;
    use emporium_storefront::memory::MemoryBackend;

    use super::*;

    #[tokio::test]
    async fn test_promote_then_demote() {
        let backend = MemoryBackend::new();
        let user = backend
            .sign_up(&Email::parse("ola@example.com").unwrap(), "Sklep123!")
            .await
            .unwrap();
        let uid = user.identity.uid.to_string();

        set_claim(&backend, &uid, ClaimAction::Promote).await.unwrap();
        assert!(backend.verify(&user.id_token).await.unwrap().claims.is_admin());

        set_claim(&backend, &uid, ClaimAction::Demote).await.unwrap();
        assert!(!backend.verify(&user.id_token).await.unwrap().claims.is_admin());
    }

    #[tokio::test]
    async fn test_blank_uid_is_rejected() {
        let backend = MemoryBackend::new();
        let err = set_claim(&backend, "  ", ClaimAction::Promote)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::EmptyUid));
    }

    #[tokio::test]
    async fn test_unknown_uid_surfaces_backend_error() {
        let backend = MemoryBackend::new();
        let err = set_claim(&backend, "ghost", ClaimAction::Promote)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Backend(_)));
    }
}
