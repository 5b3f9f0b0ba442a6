//! Централизованная конфигурация протокольного ядра
//!
//! Все константы и настройки должны быть определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::sync::OnceLock;
use std::time::Duration;

/// Глобальная конфигурация (только для чтения после инициализации)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Нижняя граница интервала ротации identity-ключа.
pub const MIN_ROTATION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // КРИПТОГРАФИЧЕСКИЕ ПАРАМЕТРЫ
    // (длины ключей, nonce и подписи фиксированы алгоритмами)
    // ============================================

    /// ID классического криптографического набора (Classic Suite)
    pub classic_suite_id: u16,

    // ============================================
    // PRE-KEYS
    // ============================================

    /// Сколько хранить старые signed pre-keys после ротации (в секундах)
    /// По умолчанию: 30 дней
    pub prekey_cleanup_period_secs: i64,

    // ============================================
    // РОТАЦИЯ IDENTITY-КЛЮЧЕЙ
    // ============================================

    /// Включена ли автоматическая ротация
    pub rotation_enabled: bool,

    /// Интервал ротации identity-ключа
    /// По умолчанию: 30 дней
    pub identity_rotation_interval: Duration,

    /// Как часто планировщик проверяет, пора ли ротировать
    /// По умолчанию: 24 часа
    pub rotation_check_interval: Duration,

    /// Сколько предыдущий identity-ключ остаётся валидным после ротации
    /// По умолчанию: 7 дней
    pub previous_identity_grace_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Криптография
            classic_suite_id: 1,

            // Pre-keys
            prekey_cleanup_period_secs: 30 * 24 * 60 * 60, // 30 days

            // Ротация
            rotation_enabled: true,
            identity_rotation_interval: Duration::from_secs(30 * 24 * 60 * 60),
            rotation_check_interval: Duration::from_secs(24 * 60 * 60),
            previous_identity_grace_period: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("IDENTITY_ROTATION_ENABLED") {
            if let Ok(parsed) = val.parse() {
                config.rotation_enabled = parsed;
            }
        }

        if let Some(secs) = env_secs("IDENTITY_ROTATION_INTERVAL_SECS") {
            config.identity_rotation_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_secs("ROTATION_CHECK_INTERVAL_SECS") {
            config.rotation_check_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_secs("IDENTITY_GRACE_PERIOD_SECS") {
            config.previous_identity_grace_period = Duration::from_secs(secs);
        }

        config
    }

    /// Интервал ротации с учётом нижней границы в 1 час
    pub fn effective_rotation_interval(&self) -> Duration {
        self.identity_rotation_interval.max(MIN_ROTATION_INTERVAL)
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }
}

fn env_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|val| val.parse().ok())
}
