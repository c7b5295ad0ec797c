//! Privileged operations shared by the admin API and the CLI.

pub mod claims;

pub use claims::{ClaimAction, UnknownAction, apply_claim_action};
