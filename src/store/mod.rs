use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    model::{attendance::AttendanceRecord, payroll::PayrollRecord, staff::StaffSalaryConfig},
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Persistence collaborator for attendance, salary and payroll data.
///
/// Implementations own identity assignment and the uniqueness rules:
/// one attendance record per `(staff_id, date)` and one payroll record
/// per `(staff_id, month, year)`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Sparse records for one staff member and month. Empty is valid.
    async fn attendance_for_month(
        &self,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Vec<AttendanceRecord>>;

    async fn attendance_on(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>>;

    /// Create-or-update keyed on `(staff_id, date)`. Fails with `NotFound`
    /// for an unknown staff member.
    ///
    /// The stored revision is always one past the revision it replaces.
    /// With `expected_revision` set, the write only happens if the stored
    /// revision (0 when unmarked) still matches, checked atomically with
    /// the write; otherwise it fails with `Conflict`.
    async fn save_attendance(
        &self,
        record: AttendanceRecord,
        expected_revision: Option<u32>,
    ) -> AppResult<AttendanceRecord>;

    async fn staff_salary(&self, staff_id: &str) -> AppResult<StaffSalaryConfig>;

    /// Replaces any record for the same `(staff_id, month, year)`.
    async fn save_payroll(&self, record: PayrollRecord) -> AppResult<PayrollRecord>;

    async fn list_payroll(
        &self,
        month: u32,
        year: i32,
        staff_id: Option<&str>,
    ) -> AppResult<Vec<PayrollRecord>>;
}
