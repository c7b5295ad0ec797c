//! In-process backend.
//!
//! Implements the same traits as the Firebase adapter against plain maps, so
//! the storefront runs with `EMPORIUM_BACKEND=memory` and the services can be
//! tested without network access. Revisions are a global write counter;
//! passwords are hashed with Argon2id.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use emporium_core::backend::{
    BackendError, Document, DocumentStore, Identity, IdentityAdmin, IdentityProvider,
    IdentitySession, Precondition, Revision,
};
use emporium_core::{Claims, Email, Uid};

use crate::firebase::auto_id;

/// The identity service's own minimum, separate from the shop's rules.
const BACKEND_MIN_PASSWORD: usize = 6;

/// Shared in-memory backend. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
    write_faults: Arc<AtomicU32>,
}

#[derive(Default)]
struct MemoryState {
    clock: u64,
    collections: HashMap<String, BTreeMap<String, StoredDocument>>,
    users: HashMap<Uid, StoredUser>,
    id_tokens: HashMap<String, Uid>,
    refresh_tokens: HashMap<String, Uid>,
}

struct StoredDocument {
    revision: u64,
    data: Map<String, Value>,
}

struct StoredUser {
    email: Email,
    password_hash: String,
    claims: Claims,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn user_by_email(&self, email: &Email) -> Option<(&Uid, &StoredUser)> {
        self.users.iter().find(|(_, user)| &user.email == email)
    }

    /// Issue a fresh token pair for `uid`, revoking nothing.
    fn issue(&mut self, uid: &Uid) -> Result<IdentitySession, BackendError> {
        let user = self
            .users
            .get(uid)
            .ok_or_else(|| BackendError::NotFound(format!("user {uid}")))?;
        let identity = Identity {
            uid: uid.clone(),
            email: Some(user.email.clone()),
            claims: user.claims.clone(),
        };
        let id_token = format!("mem-id.{}", Uuid::new_v4().simple());
        let refresh_token = format!("mem-refresh.{}", Uuid::new_v4().simple());
        self.id_tokens.insert(id_token.clone(), uid.clone());
        self.refresh_tokens.insert(refresh_token.clone(), uid.clone());
        Ok(IdentitySession {
            identity,
            id_token,
            refresh_token,
        })
    }
}

impl MemoryBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` document writes fail with
    /// [`BackendError::Unavailable`].
    pub fn fail_next_writes(&self, count: u32) {
        self.write_faults.store(count, Ordering::SeqCst);
    }

    fn take_write_fault(&self) -> Result<(), BackendError> {
        let injected = self
            .write_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(BackendError::Unavailable("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

fn to_document(id: &str, stored: &StoredDocument) -> Document {
    Document {
        id: id.to_string(),
        revision: Revision::new(stored.revision.to_string()),
        data: stored.data.clone(),
    }
}

fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Unavailable(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| to_document(id, stored)))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, stored)| to_document(id, stored))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        mut data: Map<String, Value>,
        server_timestamps: &[&str],
    ) -> Result<Document, BackendError> {
        self.take_write_fault()?;
        let mut state = self.state.write().await;
        let id = id.map_or_else(auto_id, str::to_string);
        let now = Utc::now().to_rfc3339();
        for field in server_timestamps {
            data.insert((*field).to_string(), Value::String(now.clone()));
        }

        let revision = state.tick();
        let docs = state.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(BackendError::Conflict(format!("{collection}/{id} already exists")));
        }
        let stored = StoredDocument { revision, data };
        let document = to_document(&id, &stored);
        docs.insert(id, stored);
        Ok(document)
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
        precondition: Precondition,
    ) -> Result<Revision, BackendError> {
        self.take_write_fault()?;
        let mut state = self.state.write().await;
        let revision = state.tick();
        let docs = state.collections.entry(collection.to_string()).or_default();

        let current = docs.get(id).map(|stored| stored.revision);
        match (current, &precondition) {
            (Some(stored), Precondition::Revision(expected))
                if expected.as_str() != stored.to_string() =>
            {
                Err(BackendError::Conflict(format!("{collection}/{id}")))
            }
            (Some(_), _) | (None, Precondition::None) => {
                let stored = docs
                    .entry(id.to_string())
                    .or_insert_with(|| StoredDocument {
                        revision,
                        data: Map::new(),
                    });
                stored.data.insert(field.to_string(), value);
                stored.revision = revision;
                Ok(Revision::new(revision.to_string()))
            }
            (None, Precondition::Revision(_)) => {
                Err(BackendError::Conflict(format!("{collection}/{id}")))
            }
            (None, Precondition::Exists) => {
                Err(BackendError::NotFound(format!("{collection}/{id}")))
            }
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        self.take_write_fault()?;
        let mut state = self.state.write().await;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, BackendError> {
        let mut state = self.state.write().await;
        let uid = match state.user_by_email(email) {
            Some((uid, user)) if verify_password(password, &user.password_hash) => uid.clone(),
            _ => return Err(BackendError::InvalidCredentials),
        };
        state.issue(&uid)
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, BackendError> {
        if password.chars().count() < BACKEND_MIN_PASSWORD {
            return Err(BackendError::Status {
                status: 400,
                message: "WEAK_PASSWORD".to_string(),
            });
        }
        let password_hash = hash_password(password)?;

        let mut state = self.state.write().await;
        if state.user_by_email(email).is_some() {
            return Err(BackendError::EmailTaken);
        }
        let uid = Uid::new(auto_id());
        state.users.insert(
            uid.clone(),
            StoredUser {
                email: email.clone(),
                password_hash,
                claims: Claims::default(),
            },
        );
        state.issue(&uid)
    }

    async fn refresh(&self, session: &IdentitySession) -> Result<IdentitySession, BackendError> {
        let mut state = self.state.write().await;
        let uid = state
            .refresh_tokens
            .get(&session.refresh_token)
            .cloned()
            .ok_or_else(|| BackendError::InvalidToken("unknown refresh token".to_string()))?;
        state.issue(&uid)
    }
}

#[async_trait]
impl IdentityAdmin for MemoryBackend {
    async fn verify(&self, id_token: &str) -> Result<Identity, BackendError> {
        let state = self.state.read().await;
        let uid = state
            .id_tokens
            .get(id_token)
            .ok_or_else(|| BackendError::InvalidToken("unknown id token".to_string()))?;
        let user = state
            .users
            .get(uid)
            .ok_or_else(|| BackendError::InvalidToken("account deleted".to_string()))?;
        Ok(Identity {
            uid: uid.clone(),
            email: Some(user.email.clone()),
            claims: user.claims.clone(),
        })
    }

    async fn set_custom_claims(&self, uid: &Uid, claims: &Claims) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(uid)
            .ok_or_else(|| BackendError::NotFound(format!("user {uid}")))?;
        user.claims = claims.clone();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_conditional_write_rejects_stale_revision() {
        let backend = MemoryBackend::new();
        let doc = backend
            .create("carts", Some("u1"), Map::new(), &[])
            .await
            .unwrap();

        let fresh = backend
            .set_field(
                "carts",
                "u1",
                "items",
                json!([]),
                Precondition::Revision(doc.revision.clone()),
            )
            .await
            .unwrap();
        assert_ne!(fresh, doc.revision);

        let stale = backend
            .set_field("carts", "u1", "items", json!([]), Precondition::Revision(doc.revision))
            .await;
        assert!(matches!(stale, Err(BackendError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_with_server_timestamp_and_auto_id() {
        let backend = MemoryBackend::new();
        let doc = backend
            .create("products", None, Map::new(), &["createdAt"])
            .await
            .unwrap();
        assert_eq!(doc.id.len(), 20);
        assert!(doc.data["createdAt"].is_string());
        assert_eq!(backend.count("products").await, 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let backend = MemoryBackend::new();
        backend.fail_next_writes(1);
        assert!(backend.create("orders", None, Map::new(), &[]).await.is_err());
        assert!(backend.create("orders", None, Map::new(), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = MemoryBackend::new();
        let created = backend.sign_up(&email("ala@example.com"), "Sklep123!").await.unwrap();
        let signed_in = backend.sign_in(&email("ala@example.com"), "Sklep123!").await.unwrap();
        assert_eq!(created.identity.uid, signed_in.identity.uid);

        let wrong = backend.sign_in(&email("ala@example.com"), "nope").await;
        assert!(matches!(wrong, Err(BackendError::InvalidCredentials)));

        let again = backend.sign_up(&email("ala@example.com"), "Sklep123!").await;
        assert!(matches!(again, Err(BackendError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_claims() {
        let backend = MemoryBackend::new();
        let session = backend.sign_up(&email("ola@example.com"), "Sklep123!").await.unwrap();
        assert!(!session.identity.claims.is_admin());

        backend
            .set_custom_claims(&session.identity.uid, &Claims::with_admin(true))
            .await
            .unwrap();
        let refreshed = backend.refresh(&session).await.unwrap();
        assert!(refreshed.identity.claims.is_admin());

        let verified = backend.verify(&refreshed.id_token).await.unwrap();
        assert!(verified.claims.is_admin());
    }
}
