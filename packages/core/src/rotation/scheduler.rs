//! Фоновый планировщик ротации (tokio)
//!
//! Первая проверка выполняется сразу после старта, дальше каждые
//! `check_interval`.

use crate::config::Config;
use crate::crypto::provider::CryptoProvider;
use crate::rotation::{IdentityKeyRotationManager, UserDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct RotationScheduler {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RotationScheduler {
    /// Запустить планировщик в текущем tokio runtime
    pub fn start<P: CryptoProvider>(
        manager: Arc<IdentityKeyRotationManager<P>>,
        directory: Arc<dyn UserDirectory>,
        check_interval: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let check_interval = check_interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            info!(
                target: "crypto::rotation",
                check_interval_secs = check_interval.as_secs(),
                "Rotation scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = manager.check_and_rotate_if_needed(directory.as_ref());
                        if let Some(report) = report {
                            if !report.is_complete() {
                                warn!(
                                    target: "crypto::rotation",
                                    failed = report.failed.len(),
                                    "Scheduled rotation finished with failures"
                                );
                            }
                        }
                    }
                    _ = &mut stop_rx => {
                        info!(target: "crypto::rotation", "Rotation scheduler stopped");
                        break;
                    }
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    /// Запустить с интервалом проверки из конфигурации
    pub fn start_with_config<P: CryptoProvider>(
        config: &Config,
        manager: Arc<IdentityKeyRotationManager<P>>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self::start(manager, directory, config.rotation_check_interval)
    }

    /// Остановить планировщик и дождаться завершения задачи
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            warn!(target: "crypto::rotation", error = %e, "Rotation scheduler task failed");
        }
    }
}
