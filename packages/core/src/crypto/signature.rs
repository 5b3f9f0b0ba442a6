//! Проверка подписи signed pre-key
//!
//! Единственная защита X3DH от подмены signed pre-key (MITM): злоумышленник,
//! оставивший настоящий identity-ключ и подставивший свой pre-key, должен
//! упасть здесь. Порядок проверок фиксирован, успешного пути в обход
//! криптографической проверки нет.

use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{ProtocolError, Result};
use crate::utils::validation::is_all_zero;

/// Проверить подпись signed pre-key классическим набором.
pub fn verify_signed_pre_key_signature(
    identity_key: &[u8; 32],
    signed_pre_key: &[u8; 32],
    signature: &[u8],
) -> Result<()> {
    verify_signed_pre_key_signature_with::<ClassicSuiteProvider>(
        identity_key,
        signed_pre_key,
        signature,
    )
}

/// Проверить подпись signed pre-key заданным набором.
///
/// 1. Пустая подпись: `MissingSignature`
/// 2. Длина не равна `P::signature_len()`: `InvalidSignature`
/// 3. Подпись из одних нулей: `InvalidSignature`
/// 4. Криптографическая проверка: любой отказ даёт `InvalidSignature`,
///    негодный identity-ключ даёт `InvalidKeyMaterial`
pub fn verify_signed_pre_key_signature_with<P: CryptoProvider>(
    identity_key: &[u8; 32],
    signed_pre_key: &[u8; 32],
    signature: &[u8],
) -> Result<()> {
    if signature.is_empty() {
        return Err(ProtocolError::MissingSignature);
    }

    if signature.len() != P::signature_len() {
        tracing::debug!(
            target: "crypto::x3dh",
            len = signature.len(),
            expected = P::signature_len(),
            "Signed prekey signature has wrong length"
        );
        return Err(ProtocolError::InvalidSignature);
    }

    if is_all_zero(signature) {
        return Err(ProtocolError::InvalidSignature);
    }

    match P::verify(identity_key, signed_pre_key, signature) {
        Ok(()) => Ok(()),
        Err(err @ ProtocolError::InvalidKeyMaterial(_)) => Err(err),
        Err(_) => Err(ProtocolError::InvalidSignature),
    }
}
