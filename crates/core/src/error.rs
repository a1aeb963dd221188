use adherence_types::TextError;

/// Errors produced by the adherence domain.
///
/// The API layer is solely responsible for translating these into HTTP
/// status codes; core code only signals the category and a message.
#[derive(Debug, thiserror::Error)]
pub enum AdherenceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Auth(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read store snapshot: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store snapshot: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store snapshot: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store snapshot: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to hash password: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("failed to encode token: {0}")]
    TokenEncode(jsonwebtoken::errors::Error),
}

impl From<TextError> for AdherenceError {
    fn from(err: TextError) -> Self {
        AdherenceError::Validation(err.to_string())
    }
}

pub type AdherenceResult<T> = std::result::Result<T, AdherenceError>;
