//! Custom claims carried in identity tokens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claim key for the admin flag.
pub const ADMIN_CLAIM: &str = "admin";

/// Key-value assertions embedded in an identity token.
///
/// Only the boolean `admin` flag is interpreted; every other key is kept so
/// that claims round-trip through the identity service unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, Value>);

impl Claims {
    /// Claims with the admin flag set to `admin`.
    #[must_use]
    pub fn with_admin(admin: bool) -> Self {
        let mut claims = Self::default();
        claims.set_admin(admin);
        claims
    }

    /// Whether the claims grant admin access.
    ///
    /// Only a literal `true` counts; strings such as `"true"` do not.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.0.get(ADMIN_CLAIM), Some(Value::Bool(true)))
    }

    /// Set or clear the admin flag.
    pub fn set_admin(&mut self, admin: bool) {
        self.0.insert(ADMIN_CLAIM.to_owned(), Value::Bool(admin));
    }

    /// Look up a raw claim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Keep only custom claims, dropping the registered JWT claims
    /// (`iss`, `aud`, `exp`, ...) and provider bookkeeping.
    #[must_use]
    pub fn custom_only(self) -> Self {
        const RESERVED: &[&str] = &[
            "iss",
            "aud",
            "auth_time",
            "user_id",
            "sub",
            "iat",
            "exp",
            "email",
            "email_verified",
            "firebase",
        ];
        Self(
            self.0
                .into_iter()
                .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Claims {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
