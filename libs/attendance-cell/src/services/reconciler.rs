use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use appointment_cell::{Appointment, AppointmentFilter, AppointmentStatus};

use crate::error::AttendanceError;
use crate::models::{AttendanceRecord, RecordFailure, RecordOutcome, ReconciliationReport};
use crate::store::AttendanceStore;

const UNKNOWN_DOCTOR: &str = "Unknown";
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
/// Lost compare-and-swap rounds tolerated on one record before giving up.
const MAX_CAS_ROUNDS: u32 = 16;

/// Marks today's past-due scheduled appointments `serviced`, bounded by each
/// doctor's remaining attendance count.
///
/// Every write is conditional. One unit of capacity is reserved with a
/// compare-and-swap on `count` before the appointment is moved out of
/// `scheduled`, and handed back if the appointment was no longer scheduled.
/// Concurrent runs therefore cannot service more appointments than the
/// original count, and an interrupted run can only leave capacity
/// under-reported.
pub struct Reconciler {
    store: Arc<dyn AttendanceStore>,
    max_retries: u32,
    backoff: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

/// A write result plus whether it took more than one attempt. A retried
/// conditional write that reports "no match" may have been applied by an
/// attempt whose response was lost.
struct Attempted<T> {
    value: T,
    retried: bool,
}

enum Reservation {
    Reserved,
    Exhausted,
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

impl Reconciler {
    pub fn new(store: Arc<dyn AttendanceStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries,
            backoff: DEFAULT_BACKOFF,
            shutdown: None,
        }
    }

    /// Base delay of the exponential retry backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stop between attendance records once the receiver reads `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Run one reconciliation pass as of `now`.
    ///
    /// Fails only when the attendance records or the candidate appointments
    /// cannot be loaded. A failure while working on one record is logged,
    /// recorded in the report and the run moves on to the next record.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReconciliationReport, AttendanceError> {
        self.run_until(now, None).await
    }

    /// Like [`Reconciler::run`], but stops once `deadline` has passed. The
    /// deadline is checked before each record and before each reservation,
    /// so a reserved unit is always followed by its status write or release.
    #[instrument(skip(self, deadline), fields(date = %now.date_naive()))]
    pub async fn run_until(
        &self,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<ReconciliationReport, AttendanceError> {
        let today = now.date_naive();
        let start_of_day = today.and_time(chrono::NaiveTime::MIN).and_utc();
        let mut report = ReconciliationReport::new(today, Utc::now());

        let records = self.store.list_attendance_by_date(today).await?;
        let candidates = self.store
            .list_appointments(&AppointmentFilter {
                scheduled_from: Some(start_of_day),
                scheduled_until: Some(now),
                ..AppointmentFilter::scheduled()
            })
            .await?;

        debug!("{} attendance records, {} candidate appointments", records.len(), candidates.len());

        for record in records {
            if self.shutdown_requested() {
                warn!("Shutdown requested, stopping reconciliation before record {}", record.id);
                report.interrupted = true;
                break;
            }
            if past(deadline) {
                warn!("Deadline reached, stopping reconciliation before record {}", record.id);
                report.interrupted = true;
                report.timed_out = true;
                break;
            }

            match self.reconcile_record(&record, &candidates, deadline).await {
                Ok(outcome) => {
                    let cut_short = outcome.incomplete;
                    report.push_outcome(outcome);
                    if cut_short {
                        warn!("Deadline reached while reconciling record {}", record.id);
                        report.interrupted = true;
                        report.timed_out = true;
                        break;
                    }
                }
                Err(e) => {
                    error!("Reconciliation of attendance {} (doctor {}) failed: {}", record.id, record.doctor_id, e);
                    report.push_failure(RecordFailure {
                        attendance_id: record.id,
                        doctor_id: record.doctor_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.finished_at = Some(Utc::now());
        info!(
            "Reconciliation for {} serviced {} appointments across {} records ({} failed)",
            today,
            report.total_serviced,
            report.records.len(),
            report.failures.len()
        );

        Ok(report)
    }

    async fn reconcile_record(
        &self,
        record: &AttendanceRecord,
        candidates: &[Appointment],
        deadline: Option<Instant>,
    ) -> Result<RecordOutcome, AttendanceError> {
        let doctor_name = self.doctor_name(record.doctor_id).await;
        let mut current = record.clone();
        let mut serviced = Vec::new();
        let mut skipped = Vec::new();
        let mut incomplete = false;

        let due = candidates.iter().filter(|appointment| {
            appointment.doctor_id == record.doctor_id && appointment.datetime.date_naive() == record.date
        });

        for appointment in due {
            if past(deadline) {
                incomplete = true;
                break;
            }
            if let Reservation::Exhausted = self.reserve(&mut current).await? {
                debug!("Capacity exhausted for Dr. {} on {}", doctor_name, record.date);
                break;
            }

            let transition = self
                .with_retry("update appointment status", || {
                    self.store.update_appointment_status(
                        appointment.id,
                        AppointmentStatus::Scheduled,
                        AppointmentStatus::Serviced,
                    )
                })
                .await?;

            match transition {
                Attempted { value: Some(_), .. } => {
                    info!(
                        "Appointment {} with Dr. {} at {} serviced, {} remaining",
                        appointment.id, doctor_name, appointment.datetime, current.count
                    );
                    serviced.push(appointment.id);
                }
                Attempted { value: None, retried: true } => {
                    // An earlier attempt may have gone through; keeping the
                    // unit can only under-report capacity.
                    warn!("Outcome of servicing appointment {} is unknown, keeping reserved capacity", appointment.id);
                    skipped.push(appointment.id);
                }
                Attempted { value: None, retried: false } => {
                    debug!("Appointment {} is no longer scheduled, releasing capacity", appointment.id);
                    self.release(&mut current).await?;
                    skipped.push(appointment.id);
                }
            }
        }

        Ok(RecordOutcome {
            attendance_id: record.id,
            doctor_id: record.doctor_id,
            doctor_name,
            serviced,
            skipped,
            remaining_count: current.count,
            incomplete,
        })
    }

    async fn doctor_name(&self, doctor_id: i64) -> String {
        match self.store.get_user_by_id(doctor_id).await {
            Ok(Some(user)) => user.display_name().to_string(),
            Ok(None) => {
                warn!("Doctor {} not found, using placeholder name", doctor_id);
                UNKNOWN_DOCTOR.to_string()
            }
            Err(e) => {
                warn!("Failed to look up doctor {}: {}", doctor_id, e);
                UNKNOWN_DOCTOR.to_string()
            }
        }
    }

    /// Take one unit of capacity, reloading the record whenever another
    /// writer changed the count first.
    async fn reserve(&self, current: &mut AttendanceRecord) -> Result<Reservation, AttendanceError> {
        for _ in 0..MAX_CAS_ROUNDS {
            if current.count < 1 {
                return Ok(Reservation::Exhausted);
            }

            let (id, expected) = (current.id, current.count);
            let swapped = self
                .with_retry("reserve attendance capacity", || {
                    self.store.update_attendance_count(id, expected, expected - 1)
                })
                .await?;

            match swapped.value {
                Some(updated) => {
                    *current = updated;
                    return Ok(Reservation::Reserved);
                }
                None => *current = self.reload(id).await?,
            }
        }

        Err(AttendanceError::Contention(current.id))
    }

    /// Hand one unit of capacity back.
    async fn release(&self, current: &mut AttendanceRecord) -> Result<(), AttendanceError> {
        for _ in 0..MAX_CAS_ROUNDS {
            let (id, expected) = (current.id, current.count);
            let swapped = self
                .with_retry("release attendance capacity", || {
                    self.store.update_attendance_count(id, expected, expected + 1)
                })
                .await?;

            match swapped {
                Attempted { value: Some(updated), .. } => {
                    *current = updated;
                    return Ok(());
                }
                Attempted { value: None, retried: true } => {
                    // Possibly already released; never risk releasing twice.
                    warn!("Release on attendance {} may not have been applied", current.id);
                    *current = self.reload(current.id).await?;
                    return Ok(());
                }
                Attempted { value: None, retried: false } => *current = self.reload(current.id).await?,
            }
        }

        Err(AttendanceError::Contention(current.id))
    }

    async fn reload(&self, id: i64) -> Result<AttendanceRecord, AttendanceError> {
        self.store.get_attendance(id).await?.ok_or(AttendanceError::NotFound(id))
    }

    /// Retry a write on transient store errors with exponential backoff.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut write: F) -> Result<Attempted<T>, AttendanceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttendanceError>>,
    {
        let mut attempt = 0;

        loop {
            match write().await {
                Ok(value) => return Ok(Attempted { value, retried: attempt > 0 }),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff * 2u32.pow(attempt.min(10));
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation, attempt, self.max_retries + 1, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
