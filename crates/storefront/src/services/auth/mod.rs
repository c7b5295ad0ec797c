//! Authentication session.
//!
//! One [`AuthSession`] per browser session tracks who is signed in and the
//! claims of their most recent ID token. State changes are published on a
//! `watch` channel so that dependents (the cart) can follow identity changes.
//!
//! ```text
//!   Unknown ──resolve──▶ Unauthenticated ◀──logout── Authenticated
//!      │                     │   ▲                       ▲
//!      │                   login │ failure               │
//!      │                     ▼   │                       │
//!      │                 Authenticating ────success──────┘
//!      └────────────────resolve (valid stored session)───┘
//! ```

mod error;

pub use error::AuthError;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use emporium_core::backend::{Identity, IdentityProvider, IdentitySession};
use emporium_core::{Email, validate_new_password};

/// Authentication state of one session.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Not yet resolved. Must not be treated as signed out.
    Unknown,
    Unauthenticated,
    /// A sign-in call is in flight.
    Authenticating,
    Authenticated(Identity),
}

impl AuthState {
    /// Whether the initial resolution has happened.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Receiver side of an [`AuthSession`]'s state.
#[derive(Debug, Clone)]
pub struct AuthWatcher {
    rx: watch::Receiver<AuthState>,
}

impl AuthWatcher {
    /// Current state.
    #[must_use]
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Wait until the state is no longer [`AuthState::Unknown`].
    ///
    /// Returns `Unauthenticated` if the session was dropped before it
    /// resolved.
    pub async fn wait_resolved(&mut self) -> AuthState {
        match self.rx.wait_for(AuthState::is_resolved).await {
            Ok(state) => state.clone(),
            Err(_) => AuthState::Unauthenticated,
        }
    }
}

/// Sign-in state and tokens for one browser session.
pub struct AuthSession {
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<AuthState>,
    tokens: Option<IdentitySession>,
}

impl AuthSession {
    /// New session in the `Unknown` state.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            identity,
            state,
            tokens: None,
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn watch(&self) -> AuthWatcher {
        AuthWatcher {
            rx: self.state.subscribe(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn user(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Tokens of the signed-in user, for persisting across context loss.
    #[must_use]
    pub const fn tokens(&self) -> Option<&IdentitySession> {
        self.tokens.as_ref()
    }

    /// Whether the last fetched claims grant admin access.
    ///
    /// A display hint only: privileged operations are re-checked by the
    /// admin service against a freshly verified token.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .identity()
            .is_some_and(|identity| identity.claims.is_admin())
    }

    fn publish(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    fn sign_out_locally(&mut self) {
        self.tokens = None;
        self.publish(AuthState::Unauthenticated);
    }

    fn accept(&mut self, session: IdentitySession) -> Identity {
        let identity = session.identity.clone();
        self.tokens = Some(session);
        self.publish(AuthState::Authenticated(identity.clone()));
        identity
    }

    /// Resolve the initial state from a stored session.
    ///
    /// A stored session is force-refreshed so that claims granted since the
    /// last sign-in are visible. A rejected refresh token signs out; a
    /// transient failure keeps the stored identity and its older claims.
    #[instrument(skip_all, fields(stored = stored.is_some()))]
    pub async fn resolve(&mut self, stored: Option<IdentitySession>) -> AuthState {
        match stored {
            None => self.sign_out_locally(),
            Some(stored) => match self.identity.refresh(&stored).await {
                Ok(fresh) => {
                    self.accept(fresh);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "Token refresh failed, using stored claims");
                    self.accept(stored);
                }
                Err(e) => {
                    tracing::info!(error = %e, "Stored session rejected");
                    self.sign_out_locally();
                }
            },
        }
        self.state()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email or password
    /// and `AuthError::Validation` for a malformed email. The state returns
    /// to `Unauthenticated` on any failure.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => {
                self.sign_out_locally();
                return Err(e.into());
            }
        };

        self.tokens = None;
        self.publish(AuthState::Authenticating);

        let session = match self.identity.sign_in(&email, password).await {
            Ok(session) => session,
            Err(e) => {
                self.sign_out_locally();
                return Err(AuthError::from_sign_in(e));
            }
        };

        // Re-read claims the same way a restored session does.
        let session = match self.identity.refresh(&session).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh after sign-in failed");
                session
            }
        };

        let identity = self.accept(session);
        tracing::info!(uid = %identity.uid, admin = identity.claims.is_admin(), "Signed in");
        Ok(identity)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` when the email is malformed, the
    /// confirmation differs or the password misses a strength rule, and
    /// `AuthError::Registration` when the identity service refuses the
    /// account (for example a duplicate email).
    #[instrument(skip(self, password, confirmation))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        validate_new_password(password, confirmation)?;

        let created = self
            .identity
            .sign_up(&email, password)
            .await
            .map_err(AuthError::from_sign_up)?;
        tracing::info!(uid = %created.identity.uid, "Account created");
        Ok(created.identity)
    }

    /// Sign out. Idempotent.
    pub fn logout(&mut self) {
        if let Some(identity) = self.state.borrow().identity() {
            tracing::info!(uid = %identity.uid, "Signed out");
        }
        self.sign_out_locally();
    }
}
