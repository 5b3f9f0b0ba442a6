// Управление ключами
// Identity-ключи, signed pre-keys и one-time pre-keys

use crate::config::Config;
use crate::crypto::handshake::x3dh::{OneTimePreKeyRef, X3DHKeyBundle};
use crate::crypto::primitives;
use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{ProtocolError, Result};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Пара ключей X25519 (ephemeral, signed pre-key, one-time pre-key, ratchet)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)]
    pub public_key: [u8; 32],
    private_key: [u8; 32],
}

impl KeyPair {
    pub fn from_parts(public_key: [u8; 32], private_key: [u8; 32]) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    /// Восстановить пару из приватного скаляра
    pub fn from_private_key(private_key: [u8; 32]) -> Self {
        let public_key = primitives::public_key_from_private(&private_key);
        Self {
            public_key,
            private_key,
        }
    }

    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Долговременный identity-ключ.
///
/// Это Ed25519 пара (seed + verifying key). Публичная часть публикуется в
/// bundle и подписывает signed pre-key. Для X3DH из той же пары выводится
/// X25519 скаляр, а партнёр переводит verifying key в Montgomery-форму
/// через [`identity_dh_public_key`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    #[zeroize(skip)]
    public_key: [u8; 32],
    seed: [u8; 32],
}

impl IdentityKeyPair {
    /// Сгенерировать новую пару из CSPRNG
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        primitives::fill_random(&mut seed[..])?;
        Ok(Self::from_seed(&seed))
    }

    /// Восстановить пару из 32-байтового seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self {
            public_key: signing_key.verifying_key().to_bytes(),
            seed: *seed,
        }
    }

    /// Публичный identity-ключ (Ed25519 verifying key)
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Ed25519 подпись (64 байта)
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        SigningKey::from_bytes(&self.seed)
            .sign(message)
            .to_bytes()
            .to_vec()
    }

    /// X25519 скаляр для DH-частей X3DH
    pub fn dh_private_key(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(SigningKey::from_bytes(&self.seed).to_scalar_bytes())
    }

    /// X25519 публичный ключ, соответствующий [`Self::dh_private_key`]
    pub fn dh_public_key(&self) -> [u8; 32] {
        primitives::public_key_from_private(&self.dh_private_key())
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Перевести чужой identity-ключ (Ed25519) в X25519 форму для ECDH.
pub fn identity_dh_public_key(identity_key: &[u8; 32]) -> Result<[u8; 32]> {
    let verifying_key = VerifyingKey::from_bytes(identity_key).map_err(|_| {
        ProtocolError::InvalidKeyMaterial("identity key is not a valid Ed25519 point".to_string())
    })?;

    if verifying_key.is_weak() {
        return Err(ProtocolError::InvalidKeyMaterial(
            "identity key has small order".to_string(),
        ));
    }

    Ok(verifying_key.to_montgomery().to_bytes())
}

/// Signed pre-key с метаданными
#[derive(Clone, Debug)]
pub struct SignedPreKey {
    pub key_id: u32,
    pub key_pair: KeyPair,
    pub signature: Vec<u8>,
    pub created_at: i64,
}

/// One-time pre-key
#[derive(Clone, Debug)]
pub struct OneTimePreKey {
    pub key_id: u32,
    pub key_pair: KeyPair,
}

/// Менеджер ключей ответчика: identity, signed pre-keys и запас one-time pre-keys
pub struct KeyManager<P: CryptoProvider = ClassicSuiteProvider> {
    /// Identity ключ (долговременный)
    identity: IdentityKeyPair,

    /// Текущий signed prekey
    current_signed_prekey: SignedPreKey,

    /// История старых prekey: на них ещё могут прийти handshake
    old_prekeys: HashMap<u32, SignedPreKey>,

    /// Неиспользованные one-time prekeys
    one_time_prekeys: BTreeMap<u32, OneTimePreKey>,

    next_prekey_id: u32,
    next_one_time_prekey_id: u32,

    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> KeyManager<P> {
    /// Создать менеджер с новым identity-ключом
    pub fn generate() -> Result<Self> {
        Self::from_identity(P::generate_identity_key_pair()?)
    }

    /// Создать менеджер для существующего identity-ключа
    pub fn from_identity(identity: IdentityKeyPair) -> Result<Self> {
        let current_signed_prekey = Self::new_signed_prekey(&identity, 1)?;
        Ok(Self {
            identity,
            current_signed_prekey,
            old_prekeys: HashMap::new(),
            one_time_prekeys: BTreeMap::new(),
            next_prekey_id: 2,
            next_one_time_prekey_id: 1,
            _phantom: PhantomData,
        })
    }

    fn new_signed_prekey(identity: &IdentityKeyPair, key_id: u32) -> Result<SignedPreKey> {
        let key_pair = P::generate_key_pair()?;
        let signature = P::sign(identity, &key_pair.public_key)?;
        Ok(SignedPreKey {
            key_id,
            key_pair,
            signature,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    pub fn identity_public_key(&self) -> &[u8; 32] {
        self.identity.public_key()
    }

    pub fn current_signed_prekey(&self) -> &SignedPreKey {
        &self.current_signed_prekey
    }

    /// Ротация signed prekey. Возвращает id нового ключа.
    pub fn rotate_signed_prekey(&mut self) -> Result<u32> {
        let key_id = self.next_prekey_id;
        let prekey = Self::new_signed_prekey(&self.identity, key_id)?;
        self.next_prekey_id += 1;

        let old = std::mem::replace(&mut self.current_signed_prekey, prekey);
        self.old_prekeys.insert(old.key_id, old);

        self.cleanup_old_prekeys(Config::global().prekey_cleanup_period_secs);

        tracing::debug!(
            target: "crypto::keys",
            key_id,
            retained = self.old_prekeys.len(),
            "Signed prekey rotated"
        );

        Ok(key_id)
    }

    /// Получить signed prekey по ID (текущий или из истории)
    pub fn get_prekey(&self, key_id: u32) -> Option<&SignedPreKey> {
        if self.current_signed_prekey.key_id == key_id {
            return Some(&self.current_signed_prekey);
        }
        self.old_prekeys.get(&key_id)
    }

    fn cleanup_old_prekeys(&mut self, max_age_seconds: i64) {
        let now = chrono::Utc::now().timestamp();
        self.old_prekeys
            .retain(|_, prekey| now - prekey.created_at < max_age_seconds);
    }

    pub fn old_prekeys_count(&self) -> usize {
        self.old_prekeys.len()
    }

    /// Пополнить запас one-time prekeys
    pub fn generate_one_time_prekeys(&mut self, count: usize) -> Result<Vec<u32>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let key_id = self.next_one_time_prekey_id;
            let key_pair = P::generate_key_pair()?;
            self.one_time_prekeys
                .insert(key_id, OneTimePreKey { key_id, key_pair });
            self.next_one_time_prekey_id += 1;
            ids.push(key_id);
        }
        Ok(ids)
    }

    pub fn one_time_prekey(&self, key_id: u32) -> Option<&OneTimePreKey> {
        self.one_time_prekeys.get(&key_id)
    }

    /// Изъять one-time prekey. Повторно его использовать нельзя.
    pub fn take_one_time_prekey(&mut self, key_id: u32) -> Result<OneTimePreKey> {
        self.one_time_prekeys
            .remove(&key_id)
            .ok_or(ProtocolError::PreKeyNotFound(key_id))
    }

    pub fn one_time_prekeys_count(&self) -> usize {
        self.one_time_prekeys.len()
    }

    /// Экспорт публичного bundle.
    ///
    /// Если есть запас one-time prekeys, прикладывается ключ с наименьшим id.
    /// Из запаса он не удаляется: это происходит при приёме handshake.
    pub fn export_public_bundle(&self) -> X3DHKeyBundle {
        let prekey = &self.current_signed_prekey;
        X3DHKeyBundle {
            identity_key: *self.identity.public_key(),
            signed_pre_key: prekey.key_pair.public_key,
            signed_pre_key_id: prekey.key_id,
            signed_pre_key_signature: prekey.signature.clone(),
            one_time_pre_key: self
                .one_time_prekeys
                .values()
                .next()
                .map(|opk| OneTimePreKeyRef {
                    key_id: opk.key_id,
                    public_key: opk.key_pair.public_key,
                }),
            suite_id: P::suite_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signature::verify_signed_pre_key_signature;

    #[test]
    fn test_identity_from_seed_is_deterministic() {
        let a = IdentityKeyPair::from_seed(&[9u8; 32]);
        let b = IdentityKeyPair::from_seed(&[9u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.dh_public_key(), b.dh_public_key());
    }

    #[test]
    fn test_identity_dh_conversion_matches_owner_side() {
        let identity = IdentityKeyPair::generate().unwrap();
        let converted = identity_dh_public_key(identity.public_key()).unwrap();
        assert_eq!(converted, identity.dh_public_key());
    }

    #[test]
    fn test_identity_dh_conversion_rejects_weak_key() {
        // Нейтральный элемент Edwards-кривой имеет малый порядок
        let mut identity_point = [0u8; 32];
        identity_point[0] = 1;
        let result = identity_dh_public_key(&identity_point);
        assert!(matches!(result, Err(ProtocolError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_debug_does_not_leak_private_material() {
        let pair = KeyPair::from_private_key([5u8; 32]);
        let rendered = format!("{:?}", pair);
        assert!(rendered.contains(&hex::encode(pair.public_key)));
        assert!(!rendered.contains(&hex::encode([5u8; 32])));
    }

    #[test]
    fn test_signed_prekey_is_signed_by_identity() {
        let manager = KeyManager::<ClassicSuiteProvider>::generate().unwrap();
        let prekey = manager.current_signed_prekey();
        verify_signed_pre_key_signature(
            manager.identity_public_key(),
            &prekey.key_pair.public_key,
            &prekey.signature,
        )
        .unwrap();
    }

    #[test]
    fn test_rotate_signed_prekey_keeps_history() {
        let mut manager = KeyManager::<ClassicSuiteProvider>::generate().unwrap();
        let first_id = manager.current_signed_prekey().key_id;

        let second_id = manager.rotate_signed_prekey().unwrap();
        assert_ne!(first_id, second_id);
        assert_eq!(manager.current_signed_prekey().key_id, second_id);
        assert_eq!(manager.old_prekeys_count(), 1);
        assert!(manager.get_prekey(first_id).is_some());
        assert!(manager.get_prekey(second_id).is_some());
        assert!(manager.get_prekey(999).is_none());
    }

    #[test]
    fn test_one_time_prekeys_are_consumed_once() {
        let mut manager = KeyManager::<ClassicSuiteProvider>::generate().unwrap();
        let ids = manager.generate_one_time_prekeys(3).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);

        let bundle = manager.export_public_bundle();
        assert_eq!(bundle.one_time_pre_key.as_ref().map(|opk| opk.key_id), Some(1));

        manager.take_one_time_prekey(1).unwrap();
        assert_eq!(
            manager.take_one_time_prekey(1).unwrap_err(),
            ProtocolError::PreKeyNotFound(1)
        );
        assert_eq!(manager.one_time_prekeys_count(), 2);

        let bundle = manager.export_public_bundle();
        assert_eq!(bundle.one_time_pre_key.map(|opk| opk.key_id), Some(2));
    }

    #[test]
    fn test_bundle_without_one_time_prekeys() {
        let manager = KeyManager::<ClassicSuiteProvider>::generate().unwrap();
        let bundle = manager.export_public_bundle();
        assert!(bundle.one_time_pre_key.is_none());
        assert_eq!(bundle.identity_key, *manager.identity_public_key());
    }
}
