//! Identity Toolkit and Secure Token implementation of the identity traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use emporium_core::backend::{
    BackendError, Identity, IdentityAdmin, IdentityProvider, IdentitySession,
};
use emporium_core::{Claims, Email, Uid};

use super::token::decode_payload;
use super::{FirebaseBackend, FirebaseError, IDENTITY_HOST, SECURE_TOKEN_HOST};

/// Body of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    id_token: String,
    refresh_token: String,
}

/// Secure Token responses use snake case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    /// Custom claims as a JSON-encoded string.
    custom_attributes: Option<String>,
}

impl FirebaseBackend {
    fn identity_url(&self, method: &str) -> String {
        format!("{IDENTITY_HOST}/accounts:{method}")
    }

    /// Build a session from a freshly issued token pair.
    fn session_from_tokens(
        id_token: String,
        refresh_token: String,
    ) -> Result<IdentitySession, FirebaseError> {
        let payload = decode_payload(&id_token)?;
        Ok(IdentitySession {
            identity: Identity {
                uid: payload.uid,
                email: payload.email,
                claims: payload.claims,
            },
            id_token,
            refresh_token,
        })
    }

    async fn password_call(
        &self,
        method: &str,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, FirebaseError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password,
            return_secure_token: true,
        };
        let request = self
            .client()
            .post(self.identity_url(method))
            .query(&[("key", self.api_key())])
            .json(&body);
        let response: PasswordResponse = Self::send(request).await?;
        Self::session_from_tokens(response.id_token, response.refresh_token)
    }
}

/// Parse the `customAttributes` string of a looked-up account.
fn parse_custom_attributes(raw: Option<&str>) -> Result<Claims, FirebaseError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Claims::default()),
        Some(raw) => {
            let map: BTreeMap<String, Value> = serde_json::from_str(raw)?;
            Ok(Claims::from(map))
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseBackend {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, BackendError> {
        Ok(self
            .password_call("signInWithPassword", email, password)
            .await?)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, BackendError> {
        Ok(self.password_call("signUp", email, password).await?)
    }

    #[instrument(skip_all, fields(uid = %session.identity.uid))]
    async fn refresh(&self, session: &IdentitySession) -> Result<IdentitySession, BackendError> {
        let request = self
            .client()
            .post(format!("{SECURE_TOKEN_HOST}/token"))
            .query(&[("key", self.api_key())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ]);
        let response: RefreshResponse = Self::send(request).await?;
        Ok(Self::session_from_tokens(
            response.id_token,
            response.refresh_token,
        )?)
    }
}

#[async_trait]
impl IdentityAdmin for FirebaseBackend {
    #[instrument(skip_all)]
    async fn verify(&self, id_token: &str) -> Result<Identity, BackendError> {
        let request = self
            .client()
            .post(self.identity_url("lookup"))
            .query(&[("key", self.api_key())])
            .json(&json!({ "idToken": id_token }));
        let response: LookupResponse = Self::send(request).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidToken("token matches no account".to_string()))?;

        Ok(Identity {
            uid: Uid::new(user.local_id),
            email: user.email.as_deref().and_then(|e| Email::parse(e).ok()),
            claims: parse_custom_attributes(user.custom_attributes.as_deref())?,
        })
    }

    #[instrument(skip(self, claims))]
    async fn set_custom_claims(&self, uid: &Uid, claims: &Claims) -> Result<(), BackendError> {
        let token = self.admin_token()?;
        let attributes = serde_json::to_string(claims).map_err(FirebaseError::from)?;
        let url = format!(
            "{IDENTITY_HOST}/projects/{}/accounts:update",
            self.inner.project_id
        );
        let request = self.client().post(url).bearer_auth(token).json(&json!({
            "localId": uid.as_str(),
            "customAttributes": attributes,
        }));
        Self::send::<Value>(request).await?;
        tracing::info!(uid = %uid, "Custom claims updated");
        Ok(())
    }
}
