use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use shared_config::{AppConfig, ReconciliationConfig};

use crate::error::AttendanceError;
use crate::models::ReconciliationReport;
use crate::services::reconciler::Reconciler;
use crate::store::{AttendanceStore, SupabaseAttendanceStore};

/// Drives [`Reconciler`] on a fixed interval until shutdown.
pub struct ReconciliationScheduler {
    reconciler: Reconciler,
    config: ReconciliationConfig,
}

impl ReconciliationScheduler {
    pub fn new(store: Arc<dyn AttendanceStore>, config: ReconciliationConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            reconciler: Reconciler::new(store, config.max_retries).with_shutdown(shutdown),
            config,
        }
    }

    /// Spawn the job against the configured store. Returns `None` when the
    /// job is disabled.
    pub fn spawn(config: &AppConfig, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !config.reconciliation.enabled {
            info!("Attendance reconciliation is disabled");
            return None;
        }

        let store: Arc<dyn AttendanceStore> = Arc::new(SupabaseAttendanceStore::new(config));
        let scheduler = Self::new(store, config.reconciliation.clone(), shutdown.clone());

        info!(
            "Attendance reconciliation every {:?} (timeout {:?})",
            scheduler.config.interval(),
            scheduler.config.timeout()
        );

        Some(tokio::spawn(scheduler.run(shutdown)))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("Attendance reconciliation run failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Reconciliation scheduler stopping due to shutdown");
                        break;
                    }
                }
            }
        }

        info!("Reconciliation scheduler stopped");
    }

    /// One run bounded by the configured timeout.
    pub async fn run_once(&self) -> Result<ReconciliationReport, AttendanceError> {
        run_with_timeout(&self.reconciler, &self.config).await
    }
}

/// Run with a deadline of `config.timeout()`. The run is never cancelled
/// mid-record: it stops at the next record or reservation after the
/// deadline, and the result is then reported as a timeout.
pub(crate) async fn run_with_timeout(
    reconciler: &Reconciler,
    config: &ReconciliationConfig,
) -> Result<ReconciliationReport, AttendanceError> {
    let deadline = Instant::now() + config.timeout();
    let report = reconciler.run_until(Utc::now(), Some(deadline)).await?;

    if report.timed_out {
        warn!(
            "Reconciliation run exceeded {:?} after servicing {} appointments",
            config.timeout(),
            report.total_serviced
        );
        return Err(AttendanceError::Timeout(config.timeout().as_secs()));
    }

    Ok(report)
}
