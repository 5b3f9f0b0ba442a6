// E2EE Core
// Secure session protocol: X3DH handshake, ratchet, identity key rotation

#![warn(clippy::all)]

// Модули
pub mod config;
pub mod crypto;
pub mod error;
pub mod rotation;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use config::Config;
pub use crypto::handshake::{InitialHandshake, OneTimePreKeyRef, X3DHKeyBundle, X3DHProtocol};
pub use crypto::keys::{IdentityKeyPair, KeyManager, KeyPair};
pub use crypto::messaging::RatchetState;
pub use crypto::provider::CryptoProvider;
pub use crypto::session_api::{SessionSnapshot, SignalSession};
pub use crypto::signature::verify_signed_pre_key_signature;
pub use crypto::suites::classic::ClassicSuiteProvider;
pub use error::{ProtocolError, Result};
pub use rotation::{
    CompromiseDetector, IdentityKeyRotationManager, RotationOutcome, RotationReport,
    RotationStatus, StaticCompromiseDetector, UserDirectory,
};
#[cfg(feature = "scheduler")]
pub use rotation::RotationScheduler;
pub use storage::{IdentityKeyStore, MemoryIdentityKeyStore};
pub use utils::clock::{Clock, FixedClock, SystemClock};
