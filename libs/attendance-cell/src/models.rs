use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Remaining daily capacity of one doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub id: i64,
    /// User id of the doctor.
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub count: i32,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttendanceRequest {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub count: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// RECONCILIATION REPORT
// ==============================================================================

/// What one reconciliation run did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationReport {
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records: Vec<RecordOutcome>,
    pub failures: Vec<RecordFailure>,
    pub total_serviced: usize,
    /// Stopped early on shutdown or deadline; remaining records were not
    /// visited.
    pub interrupted: bool,
    /// The run's deadline passed before every record was finished.
    #[serde(default)]
    pub timed_out: bool,
}

impl ReconciliationReport {
    pub fn new(date: NaiveDate, started_at: DateTime<Utc>) -> Self {
        Self {
            date,
            started_at,
            finished_at: None,
            records: Vec::new(),
            failures: Vec::new(),
            total_serviced: 0,
            interrupted: false,
            timed_out: false,
        }
    }

    pub(crate) fn push_outcome(&mut self, outcome: RecordOutcome) {
        self.total_serviced += outcome.serviced.len();
        self.records.push(outcome);
    }

    pub(crate) fn push_failure(&mut self, failure: RecordFailure) {
        self.failures.push(failure);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordOutcome {
    pub attendance_id: i64,
    pub doctor_id: i64,
    pub doctor_name: String,
    /// Appointment ids marked serviced, earliest first.
    pub serviced: Vec<i64>,
    /// Appointments that left `scheduled` before this run reached them.
    pub skipped: Vec<i64>,
    pub remaining_count: i32,
    /// Due appointments were left untouched because the deadline passed.
    #[serde(default)]
    pub incomplete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordFailure {
    pub attendance_id: i64,
    pub doctor_id: i64,
    pub error: String,
}
