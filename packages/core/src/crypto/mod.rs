//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Transport / Messaging hub (внешний)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SignalSession (session_api)                │
//! │  - Одна сессия = один контакт                               │
//! │  - establish / accept, encrypt / decrypt                    │
//! │  - Ротация identity-ключа, grace period                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   X3DH (handshake)        │  │  RatchetState (messaging)│
//! │  - Проверка подписи SPK   │  │  - Symmetric ratchet     │
//! │  - DH1..DH4 → root key    │  │  - DH ratchet            │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - DH (X25519)                                              │
//! │  - Signatures (Ed25519)                                     │
//! │  - AEAD (AES-256-GCM)                                       │
//! │  - KDF (HKDF-SHA256)                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ротация identity-ключей по пользователям живёт отдельно, в
//! [`crate::rotation`].
//!
//! ## Модули
//!
//! ### Core
//! - [`provider`]: CryptoProvider trait для crypto-agility
//! - [`primitives`]: X25519, HKDF, AES-GCM
//! - [`signature`]: Проверка подписи signed pre-key (защита от MITM)
//!
//! ### Protocols
//! - [`handshake::x3dh`]: X3DH протокол
//! - [`messaging::double_ratchet`]: ratchet state
//!
//! ### High-Level APIs
//! - [`session_api`]: SignalSession
//!
//! ### Utilities
//! - [`keys`]: ключевые пары и KeyManager для prekeys

// ============================================================================
// Core
// ============================================================================

/// CryptoProvider trait для crypto-agility
pub mod provider;

pub mod primitives;

pub mod signature;

// ============================================================================
// Protocols
// ============================================================================

/// Key Agreement (X3DH)
pub mod handshake;

/// Ratchet
pub mod messaging;

/// Криптографические наборы
pub mod suites;

// ============================================================================
// High-Level APIs
// ============================================================================

pub mod session_api;

// ============================================================================
// Utilities
// ============================================================================

pub mod keys;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use provider::CryptoProvider;

pub type SuiteID = u16;
