//! Источник времени для ротации
//!
//! `SystemClock` для продакшена, `FixedClock` для тестов и детерминированных
//! сценариев.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Системные часы (UTC)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Часы, которые двигаются только вручную
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Сколько прошло от `since` до `now`. Для отрицательного интервала
/// (часы ушли назад) возвращает `None`.
pub fn elapsed_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Option<std::time::Duration> {
    (now - since).to_std().ok()
}
