//! Криптографические примитивы Classic suite
//!
//! - X25519: генерация ключевых пар и ECDH
//! - HKDF-SHA256: деривация ключей с доменным разделением через `info`
//! - AES-256-GCM: AEAD, nonce генерируется на каждый вызов и идёт префиксом
//!
//! Единственный недетерминированный источник здесь - `OsRng`. Если он
//! недоступен, вызов завершается с `RandomnessFailure`; более слабого
//! запасного источника нет.

use crate::crypto::keys::KeyPair;
use crate::error::{ProtocolError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

/// Длина симметричного ключа AES-256
pub const KEY_LENGTH: usize = 32;
/// Длина nonce AES-GCM (96 бит)
pub const NONCE_LENGTH: usize = 12;
/// Длина GCM authentication tag
pub const TAG_LENGTH: usize = 16;

/// Заполнить буфер байтами из CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf)?;
    Ok(())
}

/// Сгенерировать X25519 ключевую пару.
pub fn generate_key_pair() -> Result<KeyPair> {
    let mut private_key = [0u8; 32];
    fill_random(&mut private_key)?;
    let public_key = public_key_from_private(&private_key);
    Ok(KeyPair::from_parts(public_key, private_key))
}

/// X25519 публичный ключ для заданного скаляра.
pub fn public_key_from_private(private_key: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*private_key);
    PublicKey::from(&secret).to_bytes()
}

/// X25519 ECDH.
///
/// Отклоняет публичные ключи малого порядка (включая нулевую точку):
/// такой результат не зависит от нашего приватного ключа.
pub fn shared_secret(private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
    let secret = StaticSecret::from(*private_key);
    let shared = secret.diffie_hellman(&PublicKey::from(*public_key));

    if !shared.was_contributory() {
        return Err(ProtocolError::InvalidKeyMaterial(
            "public key has low order".to_string(),
        ));
    }

    Ok(shared.to_bytes())
}

/// HKDF-SHA256.
pub fn hkdf_derive_key(secret: &[u8], salt: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut okm = vec![0u8; length];
    hkdf.expand(info, &mut okm)
        .map_err(|e| ProtocolError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// HKDF-SHA256 с выходом ровно в 32 байта.
pub fn hkdf_derive_key32(secret: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut okm = [0u8; 32];
    hkdf.expand(info, &mut okm)
        .map_err(|e| ProtocolError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// AES-256-GCM шифрование. Формат результата: `nonce || ciphertext || tag`.
pub fn encrypt_aes_gcm(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    fill_random(&mut nonce_bytes)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| ProtocolError::AeadAuthenticationFailure)?;

    let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// AES-256-GCM расшифровка блоба из [`encrypt_aes_gcm`].
///
/// При несовпадении тега возвращает `AeadAuthenticationFailure` и никаких
/// частично расшифрованных данных.
pub fn decrypt_aes_gcm(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;

    if ciphertext.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(ProtocolError::AeadAuthenticationFailure);
    }

    let (nonce, body) = ciphertext.split_at(NONCE_LENGTH);
    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| ProtocolError::AeadAuthenticationFailure)
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_LENGTH {
        return Err(ProtocolError::InvalidKeyMaterial(format!(
            "AES-256 key must be {} bytes, got {}",
            KEY_LENGTH,
            key.len()
        )));
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_public_matches_private() {
        let pair = generate_key_pair().unwrap();
        assert_eq!(pair.public_key, public_key_from_private(pair.private_key()));
        assert_ne!(pair.public_key, [0u8; 32]);
    }

    #[test]
    fn test_shared_secret_agreement() {
        let alice = generate_key_pair().unwrap();
        let bob = generate_key_pair().unwrap();

        let ab = shared_secret(alice.private_key(), &bob.public_key).unwrap();
        let ba = shared_secret(bob.private_key(), &alice.public_key).unwrap();
        assert_eq!(ab, ba);

        // Детерминизм
        let again = shared_secret(alice.private_key(), &bob.public_key).unwrap();
        assert_eq!(ab, again);
    }

    #[test]
    fn test_shared_secret_rejects_zero_point() {
        let alice = generate_key_pair().unwrap();
        let result = shared_secret(alice.private_key(), &[0u8; 32]);
        assert!(matches!(result, Err(ProtocolError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_hkdf_domain_separation() {
        let secret = [7u8; 32];
        let a = hkdf_derive_key(&secret, &[0u8; 32], b"label-a", 32).unwrap();
        let b = hkdf_derive_key(&secret, &[0u8; 32], b"label-b", 32).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, hkdf_derive_key(&secret, &[0u8; 32], b"label-a", 32).unwrap());
        assert_eq!(
            a.as_slice(),
            &hkdf_derive_key32(&secret, &[0u8; 32], b"label-a").unwrap()[..]
        );
    }

    #[test]
    fn test_hkdf_rejects_oversized_output() {
        let result = hkdf_derive_key(b"secret", b"", b"info", 255 * 32 + 1);
        assert!(matches!(result, Err(ProtocolError::KeyDerivation(_))));
    }

    #[test]
    fn test_aes_gcm_roundtrip_and_framing() {
        let key = [3u8; 32];
        let ciphertext = encrypt_aes_gcm(b"payload", &key).unwrap();
        assert_eq!(ciphertext.len(), NONCE_LENGTH + b"payload".len() + TAG_LENGTH);
        assert_eq!(decrypt_aes_gcm(&ciphertext, &key).unwrap(), b"payload");
    }

    #[test]
    fn test_aes_gcm_fresh_nonce_per_call() {
        let key = [3u8; 32];
        let c1 = encrypt_aes_gcm(b"same", &key).unwrap();
        let c2 = encrypt_aes_gcm(b"same", &key).unwrap();
        assert_ne!(c1, c2);
        assert_ne!(c1[..NONCE_LENGTH], c2[..NONCE_LENGTH]);
    }

    #[test]
    fn test_aes_gcm_fails_closed() {
        let key = [3u8; 32];
        let mut ciphertext = encrypt_aes_gcm(b"payload", &key).unwrap();

        let wrong = decrypt_aes_gcm(&ciphertext, &[4u8; 32]);
        assert_eq!(wrong, Err(ProtocolError::AeadAuthenticationFailure));

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        let tampered = decrypt_aes_gcm(&ciphertext, &key);
        assert_eq!(tampered, Err(ProtocolError::AeadAuthenticationFailure));

        let short = decrypt_aes_gcm(&[0u8; 8], &key);
        assert_eq!(short, Err(ProtocolError::AeadAuthenticationFailure));
    }

    #[test]
    fn test_aes_gcm_rejects_wrong_key_length() {
        let result = encrypt_aes_gcm(b"x", &[1u8; 16]);
        assert!(matches!(result, Err(ProtocolError::InvalidKeyMaterial(_))));
    }
}
