use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};

use crate::{
    error::{AppError, AppResult},
    model::{
        attendance::AttendanceRecord,
        payroll::{DayDeduction, PayrollRecord},
        staff::StaffSalaryConfig,
    },
    store::Backend,
    utils::{deadline::bounded, resolver::first_success},
};

/// Salary may live in the dedicated table or, for older rows, on the
/// staff record itself. Tried in this order.
const SALARY_SOURCES: [&str; 2] = [
    "SELECT basic_salary FROM staff_salary WHERE staff_id = ?",
    "SELECT basic_salary FROM staff WHERE id = ? AND basic_salary IS NOT NULL",
];

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    staff_id: String,
    date: NaiveDate,
    status: String,
    leave_type: Option<String>,
    time_in: Option<NaiveDateTime>,
    time_out: Option<NaiveDateTime>,
    revision: u32,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> AppResult<Self> {
        let status = row.status.parse().map_err(|_| {
            AppError::Internal(format!("stored status {:?} is not recognised", row.status))
        })?;
        let leave_type = row
            .leave_type
            .as_deref()
            .map(|lt| {
                lt.parse().map_err(|_| {
                    AppError::Internal(format!("stored leave_type {lt:?} is not recognised"))
                })
            })
            .transpose()?;

        Ok(AttendanceRecord {
            id: row.id,
            staff_id: row.staff_id,
            date: row.date,
            status,
            leave_type,
            time_in: row.time_in,
            time_out: row.time_out,
            revision: row.revision,
        })
    }
}

#[derive(FromRow)]
struct PayrollRow {
    id: u64,
    staff_id: String,
    month: u32,
    year: i32,
    total_days: u32,
    present_days: f64,
    gross_salary: f64,
    per_day_details: String,
    total_deductions: f64,
    net_salary: f64,
}

impl TryFrom<PayrollRow> for PayrollRecord {
    type Error = AppError;

    fn try_from(row: PayrollRow) -> AppResult<Self> {
        let per_day_details: Vec<DayDeduction> = serde_json::from_str(&row.per_day_details)
            .map_err(|e| {
                AppError::Internal(format!("payroll {} has corrupt details: {e}", row.id))
            })?;

        Ok(PayrollRecord {
            id: Some(row.id),
            staff_id: row.staff_id,
            month: row.month,
            year: row.year,
            total_days: row.total_days,
            present_days: row.present_days,
            gross_salary: row.gross_salary,
            per_day_details,
            total_deductions: row.total_deductions,
            net_salary: row.net_salary,
        })
    }
}

const ATTENDANCE_COLUMNS: &str =
    "id, staff_id, date, status, leave_type, time_in, time_out, revision";

const PAYROLL_COLUMNS: &str = "id, staff_id, month, year, total_days, present_days, gross_salary, \
     per_day_details, total_deductions, net_salary";

pub struct MySqlStore {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn ensure_staff(&self, staff_id: &str) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staff WHERE id = ?")
            .bind(staff_id)
            .fetch_one(&self.pool)
            .await?;

        if exists == 0 {
            return Err(AppError::NotFound(format!("staff member {staff_id}")));
        }
        Ok(())
    }

    async fn fetch_attendance(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE staff_id = ? AND date = ?"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(staff_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn fetch_payroll(
        &self,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<PayrollRecord> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll_records \
             WHERE staff_id = ? AND year = ? AND month = ?"
        );
        sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(staff_id)
            .bind(year)
            .bind(month)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    /// Last write wins; the stored revision still advances by one.
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (staff_id, date, status, leave_type, time_in, time_out, revision)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                leave_type = VALUES(leave_type),
                time_in = VALUES(time_in),
                time_out = VALUES(time_out),
                revision = revision + 1
            "#,
        )
        .bind(&record.staff_id)
        .bind(record.date)
        .bind(AsRef::<str>::as_ref(&record.status))
        .bind(record.leave_type.as_ref().map(AsRef::<str>::as_ref))
        .bind(record.time_in)
        .bind(record.time_out)
        .execute(&self.pool)
        .await
        .map_err(|e| write_failed(e, record))?;
        Ok(())
    }

    /// First mark of a day. Someone else marking it first is a conflict.
    async fn insert_attendance(&self, record: &AttendanceRecord) -> AppResult<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (staff_id, date, status, leave_type, time_in, time_out, revision)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&record.staff_id)
        .bind(record.date)
        .bind(AsRef::<str>::as_ref(&record.status))
        .bind(record.leave_type.as_ref().map(AsRef::<str>::as_ref))
        .bind(record.time_in)
        .bind(record.time_out)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(self.conflict(record, 0).await)
            }
            Err(e) => Err(write_failed(e, record)),
        }
    }

    /// Compare-and-set on the stored revision.
    async fn update_attendance(&self, record: &AttendanceRecord, expected: u32) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE attendance_records
            SET status = ?, leave_type = ?, time_in = ?, time_out = ?, revision = revision + 1
            WHERE staff_id = ? AND date = ? AND revision = ?
            "#,
        )
        .bind(AsRef::<str>::as_ref(&record.status))
        .bind(record.leave_type.as_ref().map(AsRef::<str>::as_ref))
        .bind(record.time_in)
        .bind(record.time_out)
        .bind(&record.staff_id)
        .bind(record.date)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| write_failed(e, record))?;

        if updated.rows_affected() == 0 {
            return Err(self.conflict(record, expected).await);
        }
        Ok(())
    }

    async fn conflict(&self, record: &AttendanceRecord, expected: u32) -> AppError {
        match self.fetch_attendance(&record.staff_id, record.date).await {
            Ok(current) => AppError::Conflict {
                expected,
                actual: current.map_or(0, |r| r.revision),
            },
            Err(e) => e,
        }
    }
}

fn write_failed(e: sqlx::Error, record: &AttendanceRecord) -> AppError {
    tracing::error!(error = %e, staff_id = %record.staff_id, "Attendance write failed");
    AppError::from(e)
}

#[async_trait]
impl Backend for MySqlStore {
    async fn attendance_for_month(
        &self,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Vec<AttendanceRecord>> {
        bounded(self.timeout, "attendance read", async {
            let sql = format!(
                r#"
                SELECT {ATTENDANCE_COLUMNS}
                FROM attendance_records
                WHERE staff_id = ? AND MONTH(date) = ? AND YEAR(date) = ?
                ORDER BY date
                "#
            );
            let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(staff_id)
                .bind(month)
                .bind(year)
                .fetch_all(&self.pool)
                .await?;

            rows.into_iter().map(AttendanceRecord::try_from).collect()
        })
        .await
    }

    async fn attendance_on(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        bounded(self.timeout, "attendance lookup", self.fetch_attendance(staff_id, date)).await
    }

    async fn save_attendance(
        &self,
        record: AttendanceRecord,
        expected_revision: Option<u32>,
    ) -> AppResult<AttendanceRecord> {
        bounded(self.timeout, "attendance write", async {
            self.ensure_staff(&record.staff_id).await?;

            match expected_revision {
                None => self.upsert_attendance(&record).await?,
                Some(0) => self.insert_attendance(&record).await?,
                Some(expected) => self.update_attendance(&record, expected).await?,
            }

            self.fetch_attendance(&record.staff_id, record.date)
                .await?
                .ok_or_else(|| AppError::Internal("attendance row vanished after write".into()))
        })
        .await
    }

    async fn staff_salary(&self, staff_id: &str) -> AppResult<StaffSalaryConfig> {
        bounded(self.timeout, "salary read", async {
            let basic_salary = first_success("salary", &SALARY_SOURCES, |sql| async move {
                sqlx::query_scalar::<_, f64>(sql)
                    .bind(staff_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("salary for staff member {staff_id}"))
                    })
            })
            .await?;

            Ok(StaffSalaryConfig {
                staff_id: staff_id.to_string(),
                basic_salary,
            })
        })
        .await
    }

    async fn save_payroll(&self, record: PayrollRecord) -> AppResult<PayrollRecord> {
        bounded(self.timeout, "payroll write", async {
            self.ensure_staff(&record.staff_id).await?;

            let details = serde_json::to_string(&record.per_day_details)
                .map_err(|e| AppError::Internal(format!("cannot encode payroll details: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO payroll_records
                    (staff_id, month, year, total_days, present_days, gross_salary,
                     per_day_details, total_deductions, net_salary)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    total_days = VALUES(total_days),
                    present_days = VALUES(present_days),
                    gross_salary = VALUES(gross_salary),
                    per_day_details = VALUES(per_day_details),
                    total_deductions = VALUES(total_deductions),
                    net_salary = VALUES(net_salary)
                "#,
            )
            .bind(&record.staff_id)
            .bind(record.month)
            .bind(record.year)
            .bind(record.total_days)
            .bind(record.present_days)
            .bind(record.gross_salary)
            .bind(details)
            .bind(record.total_deductions)
            .bind(record.net_salary)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, staff_id = %record.staff_id, "Payroll write failed");
                AppError::from(e)
            })?;

            self.fetch_payroll(&record.staff_id, record.month, record.year)
                .await
        })
        .await
    }

    async fn list_payroll(
        &self,
        month: u32,
        year: i32,
        staff_id: Option<&str>,
    ) -> AppResult<Vec<PayrollRecord>> {
        bounded(self.timeout, "payroll read", async {
            let sql = format!(
                r#"
                SELECT {PAYROLL_COLUMNS}
                FROM payroll_records
                WHERE month = ? AND year = ? AND (? IS NULL OR staff_id = ?)
                ORDER BY staff_id
                "#
            );
            let rows = sqlx::query_as::<_, PayrollRow>(&sql)
                .bind(month)
                .bind(year)
                .bind(staff_id)
                .bind(staff_id)
                .fetch_all(&self.pool)
                .await?;

            rows.into_iter().map(PayrollRecord::try_from).collect()
        })
        .await
    }
}
