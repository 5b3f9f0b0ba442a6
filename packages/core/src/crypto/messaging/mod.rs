//! Secure Messaging Protocols
//!
//! Этот модуль содержит ratchet, которым шифруются сообщения после X3DH.
//!
//! ## Dataflow
//! ```text
//! После успешного X3DH (root key у обеих сторон одинаковый):
//!
//! Alice (инициатор)                          Bob (получатель)
//! ==================                         =================
//!
//! send chain = HKDF(SK, "…:initiator")       recv chain = HKDF(SK, "…:initiator")
//! recv chain = HKDF(SK, "…:responder")       send chain = HKDF(SK, "…:responder")
//!
//! 1. encrypt(msg1) ─────────────────────────→ decrypt(msg1)
//!    (chain шагает вперёд: KDF_CK)              (тот же шаг на recv chain)
//!
//!                                            2. advance_sending_ratchet()
//!                                               → новый ratchet public key
//! 3. receive_new_ratchet_key(pub) ←────────────
//!    (recv chain из KDF_RK(root, DH))
//! ```
//!
//! ## Security Properties
//!
//! ### Forward Secrecy
//! Chain key шагает односторонне: из текущего значения нельзя получить
//! предыдущие message keys.
//!
//! ### Break-in Recovery
//! DH ratchet пересевает chain keys свежим DH.
//!
//! ### Порядок доставки
//! Строго по порядку. Пропущенные сообщения не ищутся и не кэшируются.

pub mod double_ratchet;

pub use double_ratchet::RatchetState;
