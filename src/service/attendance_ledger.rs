use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    model::attendance::{AttendanceRecord, AttendanceStatus, LeaveType, LedgerDay},
    store::Backend,
};

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of calendar days in `month` (1-12) of `year`.
pub fn days_in_month(month: u32, year: i32) -> AppResult<u32> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return Err(AppError::invalid(format!("month {month} is outside 1..=12"))),
    };
    Ok(days)
}

/// Materializes the sparse `records` into one entry per day of the month.
///
/// Records for other staff members or months are ignored. If the input
/// holds two records for the same day the higher revision wins.
pub fn build_ledger(
    staff_id: &str,
    month: u32,
    year: i32,
    records: &[AttendanceRecord],
) -> AppResult<Vec<LedgerDay>> {
    let total_days = days_in_month(month, year)?;

    let mut by_day: BTreeMap<u32, &AttendanceRecord> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.staff_id == staff_id && r.date.month() == month && r.date.year() == year)
    {
        by_day
            .entry(record.date.day())
            .and_modify(|current| {
                if record.revision > current.revision {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    (1..=total_days)
        .map(|day| {
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| AppError::invalid(format!("{year}-{month}-{day} is not a date")))?;
            let marked = by_day.get(&day);
            Ok(LedgerDay {
                day,
                date,
                status: marked.map(|r| r.status),
                leave_type: marked.and_then(|r| r.leave_type),
            })
        })
        .collect()
}

/// A leave type is required for `Leave` and forbidden otherwise.
pub fn validate_mark(status: AttendanceStatus, leave_type: Option<LeaveType>) -> AppResult<()> {
    match (status, leave_type) {
        (AttendanceStatus::Leave, Some(_)) => Ok(()),
        (AttendanceStatus::Leave, None) => {
            Err(AppError::invalid("leave_type is required when status is Leave"))
        }
        (other, Some(lt)) => Err(AppError::invalid(format!(
            "leave_type {lt} is only allowed with status Leave, got {other}"
        ))),
        (_, None) => Ok(()),
    }
}

/// Parses wire strings into a validated status/leave pair.
pub fn parse_mark(
    status: &str,
    leave_type: Option<&str>,
) -> AppResult<(AttendanceStatus, Option<LeaveType>)> {
    let status: AttendanceStatus = status.trim().parse().map_err(|_| {
        AppError::invalid(format!(
            "unknown status {status:?}; allowed: Present, Absent, HalfDay, Late, Leave"
        ))
    })?;

    let leave_type = leave_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<LeaveType>().map_err(|_| {
                AppError::invalid(format!(
                    "unknown leave_type {s:?}; allowed: casual, sick, paid, unpaid, emergency"
                ))
            })
        })
        .transpose()?;

    validate_mark(status, leave_type)?;
    Ok((status, leave_type))
}

#[derive(Debug, Clone)]
pub struct MarkDay {
    pub staff_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub leave_type: Option<LeaveType>,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    /// When set, the mark only applies if the stored revision matches.
    /// An unmarked day has revision 0.
    pub expected_revision: Option<u32>,
}

impl MarkDay {
    pub fn new(staff_id: impl Into<String>, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            staff_id: staff_id.into(),
            date,
            status,
            leave_type: None,
            time_in: None,
            time_out: None,
            expected_revision: None,
        }
    }
}

/// Create-or-update without I/O. An identical re-mark returns `existing`
/// untouched, so repeated calls never bump the revision.
pub fn apply_mark(existing: Option<AttendanceRecord>, mark: &MarkDay) -> AttendanceRecord {
    match existing {
        Some(current) => {
            let time_in = mark.time_in.or(current.time_in);
            let time_out = mark.time_out.or(current.time_out);
            if current.status == mark.status
                && current.leave_type == mark.leave_type
                && current.time_in == time_in
                && current.time_out == time_out
            {
                return current;
            }
            AttendanceRecord {
                status: mark.status,
                leave_type: mark.leave_type,
                time_in,
                time_out,
                revision: current.revision + 1,
                ..current
            }
        }
        None => AttendanceRecord {
            id: 0,
            staff_id: mark.staff_id.clone(),
            date: mark.date,
            status: mark.status,
            leave_type: mark.leave_type,
            time_in: mark.time_in,
            time_out: mark.time_out,
            revision: 1,
        },
    }
}

/// Marks or re-marks one day and persists it through `backend`.
pub async fn mark_day(backend: &dyn Backend, mark: MarkDay) -> AppResult<AttendanceRecord> {
    validate_mark(mark.status, mark.leave_type)?;

    let existing = backend.attendance_on(&mark.staff_id, mark.date).await?;

    // early reject; the backend repeats the check atomically with the write
    let actual = existing.as_ref().map_or(0, |r| r.revision);
    if let Some(expected) = mark.expected_revision.filter(|&e| e != actual) {
        return Err(AppError::Conflict { expected, actual });
    }

    let unchanged = existing.clone();
    let next = apply_mark(existing, &mark);
    if unchanged.as_ref() == Some(&next) {
        debug!(staff_id = %mark.staff_id, date = %mark.date, "Mark unchanged, skipping write");
        return Ok(next);
    }

    let saved = backend.save_attendance(next, mark.expected_revision).await?;
    info!(
        staff_id = %saved.staff_id,
        date = %saved.date,
        status = %saved.status,
        revision = saved.revision,
        "Attendance marked"
    );
    Ok(saved)
}
