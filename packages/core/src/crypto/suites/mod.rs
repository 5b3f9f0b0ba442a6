//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации CryptoProvider trait.
//!
//! ## Доступные наборы
//!
//! ### Classic Suite
//! - **DH**: X25519 (ECDH на Curve25519)
//! - **Signatures**: Ed25519 (identity-ключ подписывает signed pre-key)
//! - **AEAD**: AES-256-GCM, nonce 96 бит префиксом
//! - **KDF**: HKDF-SHA256
//! - **Suite ID**: 1
//!
//! ## Выбор suite
//!
//! ```rust
//! use e2ee_core::crypto::suites::classic::ClassicSuiteProvider;
//! use e2ee_core::crypto::provider::CryptoProvider;
//!
//! type MySuite = ClassicSuiteProvider;
//!
//! let key_pair = MySuite::generate_key_pair()?;
//! assert_ne!(key_pair.public_key, [0u8; 32]);
//! # Ok::<(), e2ee_core::error::ProtocolError>(())
//! ```

pub mod classic;
