//! Defines the CryptoProvider trait for crypto-agility.

use crate::crypto::keys::{IdentityKeyPair, KeyPair};
use crate::crypto::SuiteID;
use crate::error::Result;

/// Trait that formalizes all cryptographic operations for a specific cipher suite.
///
/// Handshake, ratchet and rotation code is generic over this trait and never
/// touches a concrete curve or cipher directly.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Generates a new X25519 key pair.
    fn generate_key_pair() -> Result<KeyPair>;

    /// Generates a new long-term identity key pair.
    fn generate_identity_key_pair() -> Result<IdentityKeyPair>;

    /// ECDH between a local private key and a remote public key.
    /// Fails with `InvalidKeyMaterial` for non-contributory (low order) peers.
    fn shared_secret(private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]>;

    /// Converts a published identity key into its DH form.
    fn identity_dh_public_key(identity_key: &[u8; 32]) -> Result<[u8; 32]>;

    /// Signs a message with the identity key.
    fn sign(identity: &IdentityKeyPair, message: &[u8]) -> Result<Vec<u8>>;

    /// Verifies a signature made by [`Self::sign`].
    /// Malformed keys fail with `InvalidKeyMaterial`, everything else with `InvalidSignature`.
    fn verify(identity_key: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<()>;

    /// Expected signature length in bytes.
    fn signature_len() -> usize;

    /// Performs AEAD encryption. The nonce is generated internally and prefixed.
    fn aead_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Performs AEAD decryption of a blob produced by [`Self::aead_encrypt`].
    fn aead_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Derives a key from input key material using HKDF.
    fn hkdf_derive_key(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>>;

    /// Derives a new root key and chain key from the current root key and DH output.
    fn kdf_rk(root_key: &[u8; 32], dh_output: &[u8; 32]) -> Result<([u8; 32], [u8; 32])>;

    /// Derives a message key and the next chain key from the current chain key.
    fn kdf_ck(chain_key: &[u8; 32]) -> Result<([u8; 32], [u8; 32])>;

    /// Returns the SuiteID associated with this CryptoProvider.
    fn suite_id() -> SuiteID;
}
