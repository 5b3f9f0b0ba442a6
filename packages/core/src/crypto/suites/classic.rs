use crate::crypto::keys::{self, IdentityKeyPair, KeyPair};
use crate::crypto::primitives;
use crate::crypto::provider::CryptoProvider;
use crate::error::{ProtocolError, Result};
use ed25519_dalek::{Signature, VerifyingKey};

/// Info label для шага DH-ratchet (KDF_RK)
const ROOT_STEP_INFO: &[u8] = b"DoubleRatchetStep";
/// Info label для message key (KDF_CK)
const MESSAGE_KEY_INFO: &[u8] = b"DoubleRatchetMessageKey";
/// Info label для следующего chain key (KDF_CK)
const CHAIN_KEY_INFO: &[u8] = b"DoubleRatchetChainKey";

/// Concrete implementation of `CryptoProvider` for the classic suite.
pub struct ClassicSuiteProvider;

impl CryptoProvider for ClassicSuiteProvider {
    fn generate_key_pair() -> Result<KeyPair> {
        primitives::generate_key_pair()
    }

    fn generate_identity_key_pair() -> Result<IdentityKeyPair> {
        IdentityKeyPair::generate()
    }

    fn shared_secret(private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
        primitives::shared_secret(private_key, public_key)
    }

    fn identity_dh_public_key(identity_key: &[u8; 32]) -> Result<[u8; 32]> {
        keys::identity_dh_public_key(identity_key)
    }

    fn sign(identity: &IdentityKeyPair, message: &[u8]) -> Result<Vec<u8>> {
        Ok(identity.sign(message))
    }

    fn verify(identity_key: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(identity_key).map_err(|e| {
            ProtocolError::InvalidKeyMaterial(format!("Invalid verifying key: {}", e))
        })?;
        if verifying_key.is_weak() {
            return Err(ProtocolError::InvalidKeyMaterial(
                "verifying key has small order".to_string(),
            ));
        }

        let signature = Signature::from_slice(signature)?;

        // verify_strict отклоняет некорректные S и слабые R
        verifying_key.verify_strict(message, &signature)?;
        Ok(())
    }

    fn signature_len() -> usize {
        ed25519_dalek::SIGNATURE_LENGTH
    }

    fn aead_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        primitives::encrypt_aes_gcm(plaintext, key)
    }

    fn aead_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        primitives::decrypt_aes_gcm(ciphertext, key)
    }

    fn hkdf_derive_key(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>> {
        primitives::hkdf_derive_key(ikm, salt, info, len)
    }

    fn kdf_rk(root_key: &[u8; 32], dh_output: &[u8; 32]) -> Result<([u8; 32], [u8; 32])> {
        let output = zeroize::Zeroizing::new(primitives::hkdf_derive_key(
            dh_output,
            root_key,
            ROOT_STEP_INFO,
            64,
        )?);

        let mut new_root_key = [0u8; 32];
        let mut chain_key = [0u8; 32];
        new_root_key.copy_from_slice(&output[..32]);
        chain_key.copy_from_slice(&output[32..]);

        Ok((new_root_key, chain_key))
    }

    fn kdf_ck(chain_key: &[u8; 32]) -> Result<([u8; 32], [u8; 32])> {
        let message_key = primitives::hkdf_derive_key32(chain_key, &[], MESSAGE_KEY_INFO)?;
        let next_chain = primitives::hkdf_derive_key32(chain_key, &[], CHAIN_KEY_INFO)?;
        Ok((message_key, next_chain))
    }

    fn suite_id() -> crate::crypto::SuiteID {
        crate::config::Config::global().classic_suite_id
    }
}
