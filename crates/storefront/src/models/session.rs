//! Session-stored values.
//!
//! The HTTP session holds only what is needed to rebuild a session context:
//! the context id and the backend-issued tokens of the signed-in user. The
//! cart itself lives in the document store.

/// Session keys.
pub mod keys {
    /// Id of the live session context (`Uuid`).
    pub const CONTEXT_ID: &str = "context_id";

    /// Tokens of the signed-in user (`IdentitySession`).
    pub const IDENTITY: &str = "identity";
}
