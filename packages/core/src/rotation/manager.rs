//! IdentityKeyRotationManager
//!
//! Политика замены долговременных identity-ключей: по интервалу, по
//! компрометации и принудительно.

use crate::config::{Config, MIN_ROTATION_INTERVAL};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::session_api::SignalSession;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{ProtocolError, Result};
use crate::rotation::{
    CompromiseDetector, RotationOutcome, RotationReport, RotationStatus, UserDirectory,
};
use crate::storage::IdentityKeyStore;
use crate::utils::clock::{elapsed_since, Clock, SystemClock};
use crate::utils::validation::is_all_zero;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Пора ли ротировать ключ, созданный в `key_rotation_time`.
///
/// Нулевой интервал означает "никогда". Если часы ушли назад и `now`
/// раньше момента ротации, ответ тоже отрицательный.
pub fn should_rotate_at(
    key_rotation_time: DateTime<Utc>,
    interval: Duration,
    now: DateTime<Utc>,
) -> bool {
    if interval.is_zero() {
        return false;
    }
    elapsed_since(key_rotation_time, now)
        .map(|elapsed| elapsed >= interval)
        .unwrap_or(false)
}

struct RotationControl {
    enabled: bool,
    rotation_interval: Duration,
    last_rotation: Option<DateTime<Utc>>,
}

pub struct IdentityKeyRotationManager<P: CryptoProvider = ClassicSuiteProvider> {
    control: RwLock<RotationControl>,
    store: Arc<dyn IdentityKeyStore>,
    detector: Arc<dyn CompromiseDetector>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> IdentityKeyRotationManager<P> {
    /// Менеджер с глобальной конфигурацией и системными часами
    pub fn new(store: Arc<dyn IdentityKeyStore>, detector: Arc<dyn CompromiseDetector>) -> Self {
        Self::with_config(Config::global(), store, detector, Arc::new(SystemClock))
    }

    pub fn with_config(
        config: &Config,
        store: Arc<dyn IdentityKeyStore>,
        detector: Arc<dyn CompromiseDetector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if config.identity_rotation_interval < MIN_ROTATION_INTERVAL {
            warn!(
                target: "crypto::rotation",
                requested_secs = config.identity_rotation_interval.as_secs(),
                "Configured rotation interval is below the minimum, clamping to 1 hour"
            );
        }

        Self {
            control: RwLock::new(RotationControl {
                enabled: config.rotation_enabled,
                rotation_interval: config.effective_rotation_interval(),
                last_rotation: None,
            }),
            store,
            detector,
            clock,
            grace_period: config.previous_identity_grace_period,
            _phantom: PhantomData,
        }
    }

    // ========================================================================
    // Control plane
    // ========================================================================

    pub fn enable(&self) {
        self.control.write().enabled = true;
        info!(target: "crypto::rotation", "Identity key rotation enabled");
    }

    pub fn disable(&self) {
        self.control.write().enabled = false;
        info!(target: "crypto::rotation", "Identity key rotation disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.control.read().enabled
    }

    /// Установить интервал ротации. Значения меньше часа поднимаются до
    /// часа. Возвращает фактически применённый интервал.
    pub fn set_rotation_interval(&self, interval: Duration) -> Duration {
        let applied = if interval < MIN_ROTATION_INTERVAL {
            warn!(
                target: "crypto::rotation",
                requested_secs = interval.as_secs(),
                "Rotation interval below minimum, clamping to 1 hour"
            );
            MIN_ROTATION_INTERVAL
        } else {
            interval
        };

        self.control.write().rotation_interval = applied;
        info!(
            target: "crypto::rotation",
            interval_secs = applied.as_secs(),
            "Rotation interval updated"
        );
        applied
    }

    pub fn rotation_interval(&self) -> Duration {
        self.control.read().rotation_interval
    }

    pub fn status(&self) -> RotationStatus {
        let control = self.control.read();
        RotationStatus {
            enabled: control.enabled,
            last_rotation: control.last_rotation,
            interval: control.rotation_interval,
        }
    }

    // ========================================================================
    // Сессии
    // ========================================================================

    /// Пора ли ротировать identity-ключ сессии (по часам менеджера)
    pub fn should_rotate_identity_key<S: CryptoProvider>(
        &self,
        session: &SignalSession<S>,
        interval: Duration,
    ) -> bool {
        should_rotate_at(session.key_rotation_time(), interval, self.clock.now())
    }

    /// Заменить identity-ключ сессии.
    ///
    /// Пара (старый, новый) проверяется внутри сессии до присваивания.
    /// Управляющие поля менеджера не блокируются.
    pub fn rotate_identity_key<S: CryptoProvider>(
        &self,
        session: &mut SignalSession<S>,
    ) -> Result<()> {
        session.rotate_identity_key_at(self.clock.now()).map(|_| ())
    }

    /// Признаёт ли сессия ключ своим с учётом grace period из конфигурации
    pub fn recognizes_identity_key<S: CryptoProvider>(
        &self,
        session: &SignalSession<S>,
        key: &[u8; 32],
    ) -> bool {
        session.recognizes_identity_key(key, self.clock.now(), self.grace_period)
    }

    /// Проверить пару (старый, новый) identity-ключ.
    ///
    /// Ротация в тот же ключ считается ошибкой, как и нулевой новый ключ.
    pub fn verify_identity_key_rotation(
        old_public: &[u8; 32],
        new_public: &[u8; 32],
    ) -> Result<()> {
        if is_all_zero(new_public) {
            return Err(ProtocolError::RotationRejected(
                "new identity key is the zero key".to_string(),
            ));
        }
        if new_public == old_public {
            return Err(ProtocolError::RotationRejected(
                "new identity key equals the old one".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Пользователи
    // ========================================================================

    /// Заменить identity-ключ пользователя в хранилище.
    ///
    /// Для разных пользователей вызовы независимы. Для одного пользователя
    /// хранилище выполняет compare-and-swap: из двух параллельных ротаций
    /// вторая получает `RotationConflict`.
    pub fn rotate_user_identity_key(&self, user_id: &str) -> Result<RotationOutcome> {
        let current = self.store.get_identity_key(user_id)?;
        let previous_public_key = current.as_ref().map(|key| *key.public_key());

        let compromised = match &previous_public_key {
            Some(public_key) if self.detector.is_compromised(user_id) => {
                warn!(
                    target: "crypto::rotation",
                    user_id,
                    key = %hex::encode(public_key),
                    "Current identity key is compromised, forcing rotation"
                );
                self.detector.report_compromise(user_id, public_key);
                true
            }
            _ => false,
        };

        let new_key = P::generate_identity_key_pair()?;
        let new_public_key = *new_key.public_key();

        match &previous_public_key {
            Some(old) => Self::verify_identity_key_rotation(old, &new_public_key)?,
            None => Self::verify_identity_key_rotation(&[0u8; 32], &new_public_key)?,
        }

        self.store
            .store_identity_key(user_id, previous_public_key.as_ref(), new_key)?;

        info!(
            target: "crypto::rotation",
            user_id,
            new_key = %hex::encode(new_public_key),
            compromised,
            "User identity key rotated"
        );

        Ok(RotationOutcome {
            user_id: user_id.to_string(),
            previous_public_key,
            new_public_key,
            compromised,
        })
    }

    /// Немедленная ротация. При выключенной ротации ничего не делает и
    /// возвращает `None`.
    pub fn force_immediate_rotation(&self, user_id: &str) -> Result<Option<RotationOutcome>> {
        if !self.is_enabled() {
            debug!(
                target: "crypto::rotation",
                user_id,
                "Rotation disabled, forced rotation skipped"
            );
            return Ok(None);
        }

        info!(target: "crypto::rotation", user_id, "Forcing immediate identity key rotation");
        self.rotate_user_identity_key(user_id).map(Some)
    }

    /// Ротировать всех перечисленных пользователей.
    ///
    /// Ошибка одного пользователя не останавливает остальных и попадает в
    /// отчёт.
    pub fn rotate_all_identity_keys(&self, user_ids: &[String]) -> RotationReport {
        let mut report = RotationReport::default();

        for user_id in user_ids {
            match self.rotate_user_identity_key(user_id) {
                Ok(outcome) => report.rotated.push(outcome),
                Err(e) => {
                    error!(
                        target: "crypto::rotation",
                        user_id = %user_id,
                        error = %e,
                        "Failed to rotate identity key"
                    );
                    report.failed.push((user_id.clone(), e));
                }
            }
        }

        info!(
            target: "crypto::rotation",
            rotated = report.rotated.len(),
            failed = report.failed.len(),
            "Bulk identity key rotation finished"
        );

        report
    }

    /// Экстренная ротация всех пользователей каталога, без оглядки на
    /// интервал. При выключенной ротации ничего не делает.
    pub fn force_emergency_rotation(
        &self,
        directory: &dyn UserDirectory,
    ) -> Option<RotationReport> {
        if !self.is_enabled() {
            debug!(target: "crypto::rotation", "Rotation disabled, emergency rotation skipped");
            return None;
        }

        warn!(target: "crypto::rotation", "Emergency rotation of all identity keys");
        let now = self.clock.now();
        let report = self.rotate_all_identity_keys(&directory.user_ids());
        self.control.write().last_rotation = Some(now);
        Some(report)
    }

    /// Плановая проверка: если ротация включена и с последней массовой
    /// ротации прошёл интервал, ротирует всех пользователей каталога.
    pub fn check_and_rotate_if_needed(
        &self,
        directory: &dyn UserDirectory,
    ) -> Option<RotationReport> {
        let now = self.clock.now();

        let due = {
            let control = self.control.read();
            if !control.enabled {
                return None;
            }
            match control.last_rotation {
                None => true,
                Some(last) => should_rotate_at(last, control.rotation_interval, now),
            }
        };

        if !due {
            debug!(target: "crypto::rotation", "Identity key rotation not due yet");
            return None;
        }

        let report = self.rotate_all_identity_keys(&directory.user_ids());
        self.control.write().last_rotation = Some(now);
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::IdentityKeyPair;
    use crate::rotation::StaticCompromiseDetector;
    use crate::storage::MemoryIdentityKeyStore;
    use crate::utils::clock::FixedClock;
    use chrono::Duration as ChronoDuration;

    struct Fixture {
        store: Arc<MemoryIdentityKeyStore>,
        detector: Arc<StaticCompromiseDetector>,
        clock: Arc<FixedClock>,
        manager: IdentityKeyRotationManager,
    }

    fn fixture(config: Config) -> Fixture {
        let store = Arc::new(MemoryIdentityKeyStore::new());
        let detector = Arc::new(StaticCompromiseDetector::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let manager = IdentityKeyRotationManager::with_config(
            &config,
            store.clone(),
            detector.clone(),
            clock.clone(),
        );
        Fixture {
            store,
            detector,
            clock,
            manager,
        }
    }

    #[test]
    fn test_interval_is_clamped() {
        let f = fixture(Config {
            identity_rotation_interval: Duration::from_secs(60),
            ..Config::default()
        });
        assert_eq!(f.manager.rotation_interval(), MIN_ROTATION_INTERVAL);

        assert_eq!(
            f.manager.set_rotation_interval(Duration::from_secs(1)),
            MIN_ROTATION_INTERVAL
        );
        assert_eq!(
            f.manager.set_rotation_interval(Duration::from_secs(7200)),
            Duration::from_secs(7200)
        );
        assert_eq!(f.manager.status().interval, Duration::from_secs(7200));
    }

    #[test]
    fn test_should_rotate_at_boundary() {
        let start = Utc::now();
        let interval = Duration::from_secs(3600);
        assert!(!should_rotate_at(start, interval, start + ChronoDuration::minutes(59)));
        assert!(should_rotate_at(start, interval, start + ChronoDuration::minutes(60)));
        assert!(!should_rotate_at(start, Duration::ZERO, start + ChronoDuration::days(365)));
        assert!(!should_rotate_at(start, interval, start - ChronoDuration::hours(5)));
    }

    #[test]
    fn test_session_rotation_uses_manager_clock() {
        let f = fixture(Config::default());
        let created = f.clock.now();
        let mut session = SignalSession::<ClassicSuiteProvider>::new_at(
            "alice",
            "bob",
            IdentityKeyPair::generate().unwrap(),
            true,
            created,
        );
        let interval = Duration::from_secs(24 * 3600);

        assert!(!f.manager.should_rotate_identity_key(&session, interval));
        f.clock.advance(ChronoDuration::hours(24));
        assert!(f.manager.should_rotate_identity_key(&session, interval));

        let old = *session.identity_key();
        f.manager.rotate_identity_key(&mut session).unwrap();
        assert_ne!(session.identity_key(), &old);
        assert_eq!(session.previous_identity_key(), Some(&old));
        assert_eq!(session.key_rotation_time(), f.clock.now());
        assert!(!f.manager.should_rotate_identity_key(&session, interval));
    }

    #[test]
    fn test_previous_key_recognized_within_configured_grace() {
        let f = fixture(Config {
            previous_identity_grace_period: Duration::from_secs(3600),
            ..Config::default()
        });
        let mut session = SignalSession::<ClassicSuiteProvider>::new_at(
            "alice",
            "bob",
            IdentityKeyPair::generate().unwrap(),
            true,
            f.clock.now(),
        );
        let old = *session.identity_key();
        f.manager.rotate_identity_key(&mut session).unwrap();

        assert!(f.manager.recognizes_identity_key(&session, &old));
        assert!(f.manager.recognizes_identity_key(&session, &session.identity_key().clone()));

        f.clock.advance(ChronoDuration::minutes(61));
        assert!(!f.manager.recognizes_identity_key(&session, &old));
    }

    #[test]
    fn test_verify_identity_key_rotation() {
        type M = IdentityKeyRotationManager;
        assert!(M::verify_identity_key_rotation(&[1u8; 32], &[2u8; 32]).is_ok());
        assert!(matches!(
            M::verify_identity_key_rotation(&[1u8; 32], &[1u8; 32]),
            Err(ProtocolError::RotationRejected(_))
        ));
        assert!(matches!(
            M::verify_identity_key_rotation(&[1u8; 32], &[0u8; 32]),
            Err(ProtocolError::RotationRejected(_))
        ));
    }

    #[test]
    fn test_rotate_user_identity_key() {
        let f = fixture(Config::default());
        let original = IdentityKeyPair::generate().unwrap();
        let original_public = *original.public_key();
        f.store.insert("alice", original);

        let outcome = f.manager.rotate_user_identity_key("alice").unwrap();
        assert_eq!(outcome.previous_public_key, Some(original_public));
        assert_ne!(outcome.new_public_key, original_public);
        assert!(!outcome.compromised);
        assert_eq!(
            f.store.get_identity_key("alice").unwrap().unwrap().public_key(),
            &outcome.new_public_key
        );
        assert_eq!(f.store.previous_public_key("alice"), Some(original_public));
    }

    #[test]
    fn test_rotate_new_user_registers_key() {
        let f = fixture(Config::default());
        let outcome = f.manager.rotate_user_identity_key("carol").unwrap();
        assert_eq!(outcome.previous_public_key, None);
        assert!(f.store.get_identity_key("carol").unwrap().is_some());
    }

    #[test]
    fn test_compromised_key_is_reported() {
        let f = fixture(Config::default());
        let original = IdentityKeyPair::generate().unwrap();
        let original_public = *original.public_key();
        f.store.insert("alice", original);
        f.detector.flag("alice");

        let outcome = f.manager.rotate_user_identity_key("alice").unwrap();
        assert!(outcome.compromised);
        assert_eq!(
            f.detector.reported(),
            vec![("alice".to_string(), original_public)]
        );
    }

    #[test]
    fn test_force_rotation_respects_enabled_flag() {
        let f = fixture(Config::default());
        f.store.insert("alice", IdentityKeyPair::generate().unwrap());

        f.manager.disable();
        assert!(!f.manager.is_enabled());
        assert_eq!(f.manager.force_immediate_rotation("alice").unwrap(), None);
        assert_eq!(f.store.load("alice").unwrap().generation, 0);

        f.manager.enable();
        assert!(f.manager.force_immediate_rotation("alice").unwrap().is_some());
        assert_eq!(f.store.load("alice").unwrap().generation, 1);
    }

    #[test]
    fn test_check_and_rotate_if_needed() {
        let f = fixture(Config {
            identity_rotation_interval: Duration::from_secs(2 * 3600),
            ..Config::default()
        });
        f.store.insert("alice", IdentityKeyPair::generate().unwrap());
        f.store.insert("bob", IdentityKeyPair::generate().unwrap());

        // Первая проверка ротирует сразу
        let report = f.manager.check_and_rotate_if_needed(f.store.as_ref()).unwrap();
        assert_eq!(report.rotated.len(), 2);
        assert!(report.is_complete());
        assert_eq!(f.manager.status().last_rotation, Some(f.clock.now()));

        f.clock.advance(ChronoDuration::hours(1));
        assert!(f.manager.check_and_rotate_if_needed(f.store.as_ref()).is_none());

        f.clock.advance(ChronoDuration::hours(1));
        assert!(f.manager.check_and_rotate_if_needed(f.store.as_ref()).is_some());
        assert_eq!(f.store.load("alice").unwrap().generation, 2);

        f.manager.disable();
        f.clock.advance(ChronoDuration::hours(10));
        assert!(f.manager.check_and_rotate_if_needed(f.store.as_ref()).is_none());
    }

    struct FailingStore;

    impl IdentityKeyStore for FailingStore {
        fn get_identity_key(&self, user_id: &str) -> Result<Option<IdentityKeyPair>> {
            if user_id == "broken" {
                return Err(ProtocolError::KeyStore("backend unavailable".to_string()));
            }
            Ok(None)
        }

        fn store_identity_key(
            &self,
            _user_id: &str,
            _expected_current: Option<&[u8; 32]>,
            _key_pair: IdentityKeyPair,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bulk_rotation_continues_past_failures() {
        let manager: IdentityKeyRotationManager = IdentityKeyRotationManager::with_config(
            &Config::default(),
            Arc::new(FailingStore),
            Arc::new(StaticCompromiseDetector::new()),
            Arc::new(SystemClock),
        );

        let users = vec!["a".to_string(), "broken".to_string(), "b".to_string()];
        let report = manager.rotate_all_identity_keys(&users);
        assert_eq!(report.rotated.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken");
        assert!(!report.is_complete());
    }

    #[test]
    fn test_emergency_rotation_respects_enabled_flag() {
        let f = fixture(Config::default());
        f.store.insert("alice", IdentityKeyPair::generate().unwrap());
        f.store.insert("bob", IdentityKeyPair::generate().unwrap());

        f.manager.disable();
        assert!(f.manager.force_emergency_rotation(f.store.as_ref()).is_none());
        assert_eq!(f.manager.status().last_rotation, None);
        assert_eq!(f.store.load("alice").unwrap().generation, 0);

        f.manager.enable();
        // Интервал не важен: последняя ротация только что была
        f.manager.check_and_rotate_if_needed(f.store.as_ref()).unwrap();
        f.clock.advance(ChronoDuration::minutes(5));

        let report = f.manager.force_emergency_rotation(f.store.as_ref()).unwrap();
        assert_eq!(report.rotated.len(), 2);
        assert!(report.is_complete());
        assert_eq!(f.manager.status().last_rotation, Some(f.clock.now()));
        assert_eq!(f.store.load("alice").unwrap().generation, 2);
        assert_eq!(f.store.load("bob").unwrap().generation, 2);
    }

    /// Хранилище, которое задерживает чтение, пока оба потока не прочитают
    /// один и тот же текущий ключ
    struct RacingStore {
        inner: MemoryIdentityKeyStore,
        barrier: std::sync::Barrier,
    }

    impl IdentityKeyStore for RacingStore {
        fn get_identity_key(&self, user_id: &str) -> Result<Option<IdentityKeyPair>> {
            let current = self.inner.get_identity_key(user_id);
            self.barrier.wait();
            current
        }

        fn store_identity_key(
            &self,
            user_id: &str,
            expected_current: Option<&[u8; 32]>,
            key_pair: IdentityKeyPair,
        ) -> Result<()> {
            self.inner.store_identity_key(user_id, expected_current, key_pair)
        }
    }

    #[test]
    fn test_concurrent_rotation_of_one_user_has_single_winner() {
        let store = Arc::new(RacingStore {
            inner: MemoryIdentityKeyStore::new(),
            barrier: std::sync::Barrier::new(2),
        });
        store.inner.insert("alice", IdentityKeyPair::generate().unwrap());

        let manager: IdentityKeyRotationManager = IdentityKeyRotationManager::with_config(
            &Config::default(),
            store.clone(),
            Arc::new(StaticCompromiseDetector::new()),
            Arc::new(SystemClock),
        );

        let results: Vec<Result<RotationOutcome>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| manager.rotate_user_identity_key("alice")))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ProtocolError::RotationConflict(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(store.inner.load("alice").unwrap().generation, 1);
    }

    /// Набор, который всегда выдаёт один и тот же identity-ключ
    struct StuckIdentityProvider;

    const STUCK_SEED: [u8; 32] = [7u8; 32];

    impl CryptoProvider for StuckIdentityProvider {
        fn generate_key_pair() -> Result<crate::crypto::keys::KeyPair> {
            ClassicSuiteProvider::generate_key_pair()
        }
        fn generate_identity_key_pair() -> Result<IdentityKeyPair> {
            Ok(IdentityKeyPair::from_seed(&STUCK_SEED))
        }
        fn shared_secret(private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
            ClassicSuiteProvider::shared_secret(private_key, public_key)
        }
        fn identity_dh_public_key(identity_key: &[u8; 32]) -> Result<[u8; 32]> {
            ClassicSuiteProvider::identity_dh_public_key(identity_key)
        }
        fn sign(identity: &IdentityKeyPair, message: &[u8]) -> Result<Vec<u8>> {
            ClassicSuiteProvider::sign(identity, message)
        }
        fn verify(identity_key: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<()> {
            ClassicSuiteProvider::verify(identity_key, message, signature)
        }
        fn signature_len() -> usize {
            ClassicSuiteProvider::signature_len()
        }
        fn aead_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
            ClassicSuiteProvider::aead_encrypt(key, plaintext)
        }
        fn aead_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
            ClassicSuiteProvider::aead_decrypt(key, ciphertext)
        }
        fn hkdf_derive_key(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>> {
            ClassicSuiteProvider::hkdf_derive_key(ikm, salt, info, len)
        }
        fn kdf_rk(root_key: &[u8; 32], dh_output: &[u8; 32]) -> Result<([u8; 32], [u8; 32])> {
            ClassicSuiteProvider::kdf_rk(root_key, dh_output)
        }
        fn kdf_ck(chain_key: &[u8; 32]) -> Result<([u8; 32], [u8; 32])> {
            ClassicSuiteProvider::kdf_ck(chain_key)
        }
        fn suite_id() -> crate::crypto::SuiteID {
            ClassicSuiteProvider::suite_id()
        }
    }

    #[test]
    fn test_rejected_session_rotation_leaves_session_untouched() {
        let f = fixture(Config::default());
        let created = f.clock.now();
        let mut session = SignalSession::<StuckIdentityProvider>::new_at(
            "alice",
            "bob",
            IdentityKeyPair::from_seed(&STUCK_SEED),
            true,
            created,
        );
        let before = *session.identity_key();
        f.clock.advance(ChronoDuration::hours(1));

        assert!(matches!(
            f.manager.rotate_identity_key(&mut session),
            Err(ProtocolError::RotationRejected(_))
        ));
        assert_eq!(session.identity_key(), &before);
        assert_eq!(session.previous_identity_key(), None);
        assert_eq!(session.key_rotation_time(), created);
    }
}
