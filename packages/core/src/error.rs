use thiserror::Error;

/// Ошибки протокольного ядра.
///
/// Все ошибки терминальны для вызова, который их вернул: ядро ничего не
/// повторяет автоматически.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Signed pre-key signature is missing")]
    MissingSignature,
    #[error("Signed pre-key signature is invalid")]
    InvalidSignature,
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),
    #[error("Session is not established")]
    UninitializedSession,
    #[error("AEAD authentication failed")]
    AeadAuthenticationFailure,
    #[error("Secure randomness unavailable: {0}")]
    RandomnessFailure(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Identity key rotation rejected: {0}")]
    RotationRejected(String),
    #[error("Operation is not valid for this session role")]
    RoleMismatch,
    #[error("DH ratchet transition out of turn")]
    RatchetOutOfTurn,
    #[error("Pre-key {0} not found")]
    PreKeyNotFound(u32),
    #[error("Identity key store error: {0}")]
    KeyStore(String),
    #[error("Concurrent identity key rotation for user {0}")]
    RotationConflict(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rand::Error> for ProtocolError {
    fn from(err: rand::Error) -> Self {
        ProtocolError::RandomnessFailure(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for ProtocolError {
    fn from(_: ed25519_dalek::SignatureError) -> Self {
        ProtocolError::InvalidSignature
    }
}

impl From<bincode::Error> for ProtocolError {
    fn from(err: bincode::Error) -> Self {
        ProtocolError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
