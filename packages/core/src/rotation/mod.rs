//! Ротация identity-ключей
//!
//! ```text
//! RotationScheduler (feature "scheduler", tokio)
//!        │  каждые rotation_check_interval
//!        ▼
//! IdentityKeyRotationManager ──→ IdentityKeyStore (CAS по пользователю)
//!        │                  └──→ CompromiseDetector
//!        ▼
//! RotationOutcome / RotationReport
//! ```
//!
//! Управляющие поля менеджера (enabled, interval, last_rotation) под своим
//! RwLock и не пересекаются с состоянием сессий: ротация одного
//! пользователя не блокирует encrypt/decrypt чужих сессий.

pub mod manager;
#[cfg(feature = "scheduler")]
pub mod scheduler;

use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

pub use manager::IdentityKeyRotationManager;
#[cfg(feature = "scheduler")]
pub use scheduler::RotationScheduler;

/// Источник сигнала о компрометации ключа
pub trait CompromiseDetector: Send + Sync {
    fn is_compromised(&self, user_id: &str) -> bool;

    /// Зафиксировать, что ключ пользователя скомпрометирован и будет заменён
    fn report_compromise(&self, _user_id: &str, _public_key: &[u8; 32]) {}
}

/// Список пользователей для массовой ротации
pub trait UserDirectory: Send + Sync {
    fn user_ids(&self) -> Vec<String>;
}

impl UserDirectory for Vec<String> {
    fn user_ids(&self) -> Vec<String> {
        self.clone()
    }
}

impl UserDirectory for crate::storage::MemoryIdentityKeyStore {
    fn user_ids(&self) -> Vec<String> {
        crate::storage::MemoryIdentityKeyStore::user_ids(self)
    }
}

/// Детектор со списком помеченных пользователей
#[derive(Debug, Default)]
pub struct StaticCompromiseDetector {
    flagged: Mutex<HashSet<String>>,
    reported: Mutex<Vec<(String, [u8; 32])>>,
}

impl StaticCompromiseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, user_id: &str) {
        self.flagged.lock().insert(user_id.to_string());
    }

    pub fn clear(&self, user_id: &str) {
        self.flagged.lock().remove(user_id);
    }

    /// Все зафиксированные компрометации (пользователь, публичный ключ)
    pub fn reported(&self) -> Vec<(String, [u8; 32])> {
        self.reported.lock().clone()
    }
}

impl CompromiseDetector for StaticCompromiseDetector {
    fn is_compromised(&self, user_id: &str) -> bool {
        self.flagged.lock().contains(user_id)
    }

    fn report_compromise(&self, user_id: &str, public_key: &[u8; 32]) {
        self.reported
            .lock()
            .push((user_id.to_string(), *public_key));
    }
}

/// Результат ротации одного пользователя
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub user_id: String,
    pub previous_public_key: Option<[u8; 32]>,
    pub new_public_key: [u8; 32],
    /// Ротация была вызвана компрометацией текущего ключа
    pub compromised: bool,
}

/// Результат массовой ротации
#[derive(Debug, Clone, Default)]
pub struct RotationReport {
    pub rotated: Vec<RotationOutcome>,
    pub failed: Vec<(String, ProtocolError)>,
}

impl RotationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Снимок управляющих полей менеджера
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationStatus {
    pub enabled: bool,
    pub last_rotation: Option<DateTime<Utc>>,
    pub interval: Duration,
}
