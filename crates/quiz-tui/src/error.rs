//! Error types for the store, identity and user-service boundaries.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;
pub type AuthResult<T> = Result<T, AuthError>;
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("document store is unavailable")]
    Unavailable,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the identity provider.
///
/// The display strings are shown to the player as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredential,

    #[error("Password should be at least 6 characters")]
    WeakPassword,

    #[error("Email is already in use")]
    EmailInUse,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Name is required")]
    MissingName,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Account service unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the user service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("User not found")]
    UserNotFound(String),

    #[error("Name is required")]
    MissingName,

    #[error("corrupt user document {id}: {source}")]
    CorruptDocument {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Figment(Box::new(error))
    }
}
