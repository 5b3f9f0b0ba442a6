//! Key Agreement Protocols
//!
//! Этот модуль содержит протокол установки ключей (key agreement).
//!
//! Цель: Установить общий секретный ключ между двумя сторонами без предварительного
//! обмена секретами.
//!
//! ## Dataflow
//! ```text
//! Alice (инициатор)                          Bob (получатель)
//! ==================                         =================
//!
//! 1. Генерирует ephemeral key
//! 2. Получает Bob's bundle от сервера
//! 3. X3DHProtocol::perform_as_initiator()
//!    → root key
//! 4. Отправляет InitialHandshake
//!    (IK_A, EK_A, id signed/one-time prekey)
//!                                            1. Получает InitialHandshake
//!                                            2. Находит свои prekeys по id
//!                                            3. X3DHProtocol::perform_as_responder()
//!                                               → root key (тот же!)
//! ```
//!
//! Ephemeral key инициатора используется дважды: в X3DH (DH2, DH3, DH4) и
//! как первый ratchet key. Signed prekey ответчика аналогично становится его
//! первым ratchet key.

use serde::{Deserialize, Serialize};

pub mod x3dh;

pub use x3dh::{OneTimePreKeyRef, X3DHKeyBundle, X3DHProtocol};

/// Первое сообщение инициатора, по которому ответчик повторяет X3DH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialHandshake {
    /// Identity-ключ инициатора (IK_A, Ed25519)
    pub initiator_identity: [u8; 32],

    /// Ephemeral public key инициатора (EK_A)
    pub ephemeral_key: [u8; 32],

    /// Какой signed prekey ответчика использован
    pub signed_pre_key_id: u32,

    /// Какой one-time prekey использован, если был
    pub one_time_pre_key_id: Option<u32>,
}
