use thiserror::Error;

/// Errors surfaced by the profile document store.
///
/// Uniqueness violations and schema validation failures must stay
/// distinguishable so the lifecycle service can map them to separate
/// failure reasons; everything engine-level is wrapped as `Backend`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("A profile with e-mail '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Required field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the password credential codec.
///
/// Malformed records never surface here; verification fails closed to
/// `false` instead. These variants indicate a broken runtime and are fatal
/// to the calling operation.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Secure random source failed: {0}")]
    Rng(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),
}

/// Errors from the authentication service.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Log-on information failed validation")]
    InvalidLogOnInfo,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    #[error("Runtime failure: {0}")]
    Runtime(String),
}
