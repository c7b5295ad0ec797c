//! CLI subcommands.

pub mod admin;
pub mod seed;

use thiserror::Error;

use emporium_core::backend::BackendError;
use emporium_storefront::config::{ConfigError, FirebaseConfig};
use emporium_storefront::firebase::{FirebaseBackend, FirebaseError};
use emporium_storefront::services::ProductAdminError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Firebase(#[from] FirebaseError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("uid must not be empty")]
    EmptyUid,

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("product {index} ({name}): {source}")]
    Product {
        index: usize,
        name: String,
        #[source]
        source: ProductAdminError,
    },
}

/// Firebase backend with admin credentials from the environment.
///
/// # Errors
///
/// Returns `CommandError::Config` when a Firebase variable, including
/// `FIREBASE_ADMIN_ACCESS_TOKEN`, is missing.
pub fn connect() -> Result<FirebaseBackend, CommandError> {
    let _ = dotenvy::dotenv();

    let config = FirebaseConfig::from_env()?;
    if config.admin_access_token.is_none() {
        return Err(ConfigError::MissingEnvVar("FIREBASE_ADMIN_ACCESS_TOKEN".to_string()).into());
    }
    tracing::info!(project_id = %config.project_id, "Connecting to Firebase");
    Ok(FirebaseBackend::new(&config)?)
}
