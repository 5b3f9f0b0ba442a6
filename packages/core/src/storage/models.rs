// Модели данных для хранилища

use crate::crypto::keys::IdentityKeyPair;

/// Identity-ключ пользователя в хранилище
#[derive(Debug, Clone)]
pub struct StoredIdentityKey {
    pub key_pair: IdentityKeyPair,
    /// Публичная часть ключа, который был заменён последней ротацией
    pub previous_public_key: Option<[u8; 32]>,
    /// Сколько раз ключ заменялся
    pub generation: u64,
}
