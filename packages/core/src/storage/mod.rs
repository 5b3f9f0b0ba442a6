// Хранилище identity-ключей
//
// Ядро не владеет персистентностью: слой хранения реализует
// `IdentityKeyStore` поверх своей БД. `MemoryIdentityKeyStore` - для тестов
// и однопроцессных конфигураций.

pub mod memory;
pub mod models;

use crate::crypto::keys::IdentityKeyPair;
use crate::error::Result;

pub use memory::MemoryIdentityKeyStore;
pub use models::StoredIdentityKey;

/// Хранилище identity-ключей по пользователям
///
/// Точка сериализации ротаций одного пользователя: `store_identity_key`
/// работает как compare-and-swap.
pub trait IdentityKeyStore: Send + Sync {
    /// Текущий identity-ключ пользователя, если он есть
    fn get_identity_key(&self, user_id: &str) -> Result<Option<IdentityKeyPair>>;

    /// Записать новый ключ, если текущий публичный ключ всё ещё равен
    /// `expected_current` (`None` - ключа ещё не было).
    ///
    /// Если ключ успели заменить, возвращает `RotationConflict`.
    fn store_identity_key(
        &self,
        user_id: &str,
        expected_current: Option<&[u8; 32]>,
        key_pair: IdentityKeyPair,
    ) -> Result<()>;
}
