//! Error types and machine-readable error codes.

use serde::{Deserialize, Serialize};

/// Failures of the authenticated-encryption codec itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Wire form is not valid base64 or too short to hold nonce and tag.
    #[error("malformed credential: {0}")]
    Decode(String),

    /// Tag did not verify: wrong key, or nonce/tag/ciphertext altered.
    #[error("credential failed integrity check")]
    Integrity,

    #[error("encryption failed")]
    Seal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("no first-stage credential held; request one first")]
    NoFirstStage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

impl AuthError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidCredential(_) => "invalid_credential",
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::State(StateError::NoFirstStage) => "no_first_stage",
            Self::Encoding(_) => "encoding_failed",
        }
    }
}

/// Codec detail does not cross a component boundary: decode and integrity
/// failures both become `InvalidCredential`.
impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Seal => Self::Encoding(err.to_string()),
            CodecError::Decode(_) | CodecError::Integrity => {
                Self::InvalidCredential(err.to_string())
            }
        }
    }
}

/// Serializable error summary, used by reports that leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}
