// In-memory хранилище identity-ключей для тестов и non-persistent конфигураций

use crate::crypto::keys::IdentityKeyPair;
use crate::error::{ProtocolError, Result};
use crate::storage::models::StoredIdentityKey;
use crate::storage::IdentityKeyStore;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory хранилище
#[derive(Default)]
pub struct MemoryIdentityKeyStore {
    keys: Mutex<HashMap<String, StoredIdentityKey>>,
}

impl MemoryIdentityKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Положить ключ без проверки текущего (начальная регистрация)
    pub fn insert(&self, user_id: &str, key_pair: IdentityKeyPair) {
        self.keys.lock().insert(
            user_id.to_string(),
            StoredIdentityKey {
                key_pair,
                previous_public_key: None,
                generation: 0,
            },
        );
    }

    pub fn load(&self, user_id: &str) -> Option<StoredIdentityKey> {
        self.keys.lock().get(user_id).cloned()
    }

    pub fn previous_public_key(&self, user_id: &str) -> Option<[u8; 32]> {
        self.keys
            .lock()
            .get(user_id)
            .and_then(|stored| stored.previous_public_key)
    }

    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl IdentityKeyStore for MemoryIdentityKeyStore {
    fn get_identity_key(&self, user_id: &str) -> Result<Option<IdentityKeyPair>> {
        Ok(self
            .keys
            .lock()
            .get(user_id)
            .map(|stored| stored.key_pair.clone()))
    }

    fn store_identity_key(
        &self,
        user_id: &str,
        expected_current: Option<&[u8; 32]>,
        key_pair: IdentityKeyPair,
    ) -> Result<()> {
        let mut keys = self.keys.lock();
        let current = keys.get(user_id);

        let current_public = current.map(|stored| stored.key_pair.public_key());
        if current_public != expected_current {
            return Err(ProtocolError::RotationConflict(user_id.to_string()));
        }

        let generation = current.map(|stored| stored.generation + 1).unwrap_or(0);
        let previous_public_key = current_public.copied();

        keys.insert(
            user_id.to_string(),
            StoredIdentityKey {
                key_pair,
                previous_public_key,
                generation,
            },
        );
        Ok(())
    }
}
