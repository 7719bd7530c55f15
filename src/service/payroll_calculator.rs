use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    model::{
        attendance::{AttendanceStatus, LeaveType, LedgerDay},
        payroll::{DayDeduction, PayrollRecord},
        staff::StaffSalaryConfig,
    },
    service::attendance_ledger::{build_ledger, days_in_month},
    store::Backend,
};

/// Free days per month for each allowance-bearing leave type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaveAllowance {
    pub casual: u32,
    pub sick: u32,
    pub emergency: u32,
}

impl LeaveAllowance {
    fn for_type(&self, leave_type: LeaveType) -> Option<u32> {
        match leave_type {
            LeaveType::Casual => Some(self.casual),
            LeaveType::Sick => Some(self.sick),
            LeaveType::Emergency => Some(self.emergency),
            LeaveType::Paid | LeaveType::Unpaid => None,
        }
    }
}

/// How a day nobody marked is priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmarkedDay {
    /// Full-day deduction, so a missed mark never grants pay.
    #[default]
    Absent,
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PayrollPolicy {
    pub leave_allowance: LeaveAllowance,
    /// Fraction of the daily rate lost per `Late` day. Zero by default.
    pub late_deduction_fraction: f64,
    pub unmarked: UnmarkedDay,
}

/// Half-up rounding to cents.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // absorb representation error so 1.005 rounds to 1.01
    let nudged = scaled + scaled.signum() * 1e-7;
    nudged.round() / 100.0
}

struct DayOutcome {
    deduction: f64,
    presence: f64,
}

/// Prices one ledger day. `used` tracks allowance consumed so far this month.
fn price_day(
    day: &LedgerDay,
    daily_rate: f64,
    policy: &PayrollPolicy,
    used: &mut LeaveAllowance,
) -> DayOutcome {
    let full = DayOutcome { deduction: daily_rate, presence: 0.0 };

    match (day.status, day.leave_type) {
        (Some(AttendanceStatus::Present), _) => DayOutcome { deduction: 0.0, presence: 1.0 },
        (Some(AttendanceStatus::HalfDay), _) => DayOutcome {
            deduction: 0.5 * daily_rate,
            presence: 0.5,
        },
        (Some(AttendanceStatus::Late), _) => DayOutcome {
            deduction: policy.late_deduction_fraction * daily_rate,
            presence: 0.0,
        },
        (Some(AttendanceStatus::Leave), Some(LeaveType::Paid)) => {
            DayOutcome { deduction: 0.0, presence: 1.0 }
        }
        (Some(AttendanceStatus::Leave), Some(leave_type)) => {
            let Some(allowed) = policy.leave_allowance.for_type(leave_type) else {
                return full;
            };
            let taken = match leave_type {
                LeaveType::Casual => &mut used.casual,
                LeaveType::Sick => &mut used.sick,
                _ => &mut used.emergency,
            };
            if *taken < allowed {
                *taken += 1;
                DayOutcome { deduction: 0.0, presence: 0.0 }
            } else {
                full
            }
        }
        // a Leave without a type cannot pass validation; price it like unpaid
        (Some(AttendanceStatus::Leave), None) | (Some(AttendanceStatus::Absent), _) => full,
        (None, _) => match policy.unmarked {
            UnmarkedDay::Absent => full,
            UnmarkedDay::Ignore => DayOutcome { deduction: 0.0, presence: 0.0 },
        },
    }
}

/// Turns a month's ledger into a payroll record. Pure and deterministic;
/// `id` is left for the store to assign.
pub fn generate_payroll(
    staff_id: &str,
    month: u32,
    year: i32,
    basic_salary: f64,
    ledger: &[LedgerDay],
    policy: &PayrollPolicy,
) -> AppResult<PayrollRecord> {
    if !basic_salary.is_finite() || basic_salary < 0.0 {
        return Err(AppError::invalid(format!(
            "basic salary must be a non-negative amount, got {basic_salary}"
        )));
    }

    let fraction = policy.late_deduction_fraction;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(AppError::invalid(format!(
            "late deduction fraction must be within 0..=1, got {fraction}"
        )));
    }

    let total_days = days_in_month(month, year)?;
    if total_days == 0 {
        return Err(AppError::invalid("month has no days"));
    }
    if ledger.len() != total_days as usize {
        return Err(AppError::LedgerLengthMismatch {
            expected: total_days as usize,
            actual: ledger.len(),
        });
    }

    let daily_rate = basic_salary / f64::from(total_days);
    let mut used = LeaveAllowance::default();
    let mut present_days = 0.0;
    let mut per_day_details = Vec::with_capacity(ledger.len());

    for day in ledger {
        let outcome = price_day(day, daily_rate, policy, &mut used);
        present_days += outcome.presence;
        per_day_details.push(DayDeduction {
            date: day.date,
            status: day.status,
            leave_type: day.leave_type,
            deduction_amount: round2(outcome.deduction),
        });
    }

    let total_deductions = round2(per_day_details.iter().map(|d| d.deduction_amount).sum());
    let gross_salary = basic_salary;

    Ok(PayrollRecord {
        id: None,
        staff_id: staff_id.to_string(),
        month,
        year,
        total_days,
        present_days,
        gross_salary,
        per_day_details,
        total_deductions,
        net_salary: gross_salary - total_deductions,
    })
}

/// Reads the month's attendance, prices it and stores the result,
/// replacing any earlier run for the same staff member and month.
pub async fn run_payroll(
    backend: &dyn Backend,
    salary: &StaffSalaryConfig,
    month: u32,
    year: i32,
    policy: &PayrollPolicy,
) -> AppResult<PayrollRecord> {
    days_in_month(month, year)?;

    let records = backend
        .attendance_for_month(&salary.staff_id, month, year)
        .await?;
    let ledger = build_ledger(&salary.staff_id, month, year, &records)?;
    let payroll = generate_payroll(
        &salary.staff_id,
        month,
        year,
        salary.basic_salary,
        &ledger,
        policy,
    )?;

    let saved = backend.save_payroll(payroll).await?;
    info!(
        staff_id = %saved.staff_id,
        month,
        year,
        net_salary = saved.net_salary,
        "Payroll generated"
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::attendance_ledger::{MarkDay, mark_day};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn ledger_of(month: u32, year: i32, statuses: &[Option<AttendanceStatus>]) -> Vec<LedgerDay> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| LedgerDay {
                day: i as u32 + 1,
                date: NaiveDate::from_ymd_opt(year, month, i as u32 + 1).unwrap(),
                status: *status,
                leave_type: None,
            })
            .collect()
    }

    fn uniform(month: u32, year: i32, status: AttendanceStatus) -> Vec<LedgerDay> {
        let days = days_in_month(month, year).unwrap() as usize;
        ledger_of(month, year, &vec![Some(status); days])
    }

    fn priced(month: u32, year: i32, basic_salary: f64, ledger: &[LedgerDay]) -> PayrollRecord {
        let policy = PayrollPolicy::default();
        generate_payroll("S1", month, year, basic_salary, ledger, &policy).unwrap()
    }

    fn with_leave(
        mut ledger: Vec<LedgerDay>,
        days: &[u32],
        leave_type: LeaveType,
    ) -> Vec<LedgerDay> {
        for &d in days {
            let entry = &mut ledger[d as usize - 1];
            entry.status = Some(AttendanceStatus::Leave);
            entry.leave_type = Some(leave_type);
        }
        ledger
    }

    #[test]
    fn full_attendance_has_no_deductions() {
        let ledger = uniform(6, 2024, AttendanceStatus::Present);
        let p = priced(6, 2024, 30000.0, &ledger);

        assert_eq!(p.total_days, 30);
        assert_eq!(p.total_deductions, 0.0);
        assert_eq!(p.net_salary, 30000.0);
        assert_eq!(p.present_days, 30.0);
        assert_eq!(p.per_day_details.len(), 30);
    }

    #[test]
    fn full_absence_deducts_everything() {
        let ledger = uniform(6, 2024, AttendanceStatus::Absent);
        let p = priced(6, 2024, 30000.0, &ledger);

        assert_eq!(p.total_deductions, 30000.0);
        assert_eq!(p.net_salary, 0.0);
        assert_eq!(p.present_days, 0.0);
    }

    #[test]
    fn three_absences_in_a_31_day_month() {
        let mut statuses = vec![Some(AttendanceStatus::Present); 28];
        statuses.extend([Some(AttendanceStatus::Absent); 3]);
        let ledger = ledger_of(1, 2024, &statuses);

        let p = priced(1, 2024, 31000.0, &ledger);

        assert_eq!(p.per_day_details[30].deduction_amount, 1000.0);
        assert_eq!(p.total_deductions, 3000.0);
        assert_eq!(p.net_salary, 28000.0);
        assert_eq!(p.present_days, 28.0);
    }

    #[test]
    fn unmarked_day_is_priced_as_absent_by_default() {
        let mut ledger = uniform(6, 2024, AttendanceStatus::Present);
        ledger[14].status = None;

        let p = priced(6, 2024, 30000.0, &ledger);
        assert_eq!(p.total_deductions, 1000.0);
        assert_eq!(p.net_salary, 29000.0);

        let lenient = PayrollPolicy { unmarked: UnmarkedDay::Ignore, ..PayrollPolicy::default() };
        let p = generate_payroll("S1", 6, 2024, 30000.0, &ledger, &lenient).unwrap();
        assert_eq!(p.total_deductions, 0.0);
    }

    #[test]
    fn rounds_per_day_and_total_to_cents() {
        let mut statuses = vec![Some(AttendanceStatus::Absent); 25];
        statuses.extend([Some(AttendanceStatus::Present); 6]);
        let ledger = ledger_of(1, 2024, &statuses);

        let p = priced(1, 2024, 1000.0, &ledger);

        assert_eq!(p.per_day_details[0].deduction_amount, 32.26);
        assert_eq!(p.total_deductions, 806.5);
        assert_eq!(p.net_salary, p.gross_salary - p.total_deductions);
        assert_eq!(p.net_salary, 193.5);
    }

    #[test]
    fn net_salary_is_not_clamped() {
        let ledger = uniform(1, 2024, AttendanceStatus::Absent);
        let p = priced(1, 2024, 1000.0, &ledger);

        // 31 x 32.26 overshoots the salary by rounding
        assert_eq!(p.total_deductions, 1000.06);
        assert!(p.net_salary < 0.0);
        assert_eq!(p.net_salary, p.gross_salary - p.total_deductions);
    }

    #[test]
    fn half_day_loses_half_and_counts_half() {
        let mut ledger = uniform(6, 2024, AttendanceStatus::Present);
        ledger[0].status = Some(AttendanceStatus::HalfDay);
        ledger[1].status = Some(AttendanceStatus::HalfDay);

        let p = priced(6, 2024, 30000.0, &ledger);
        assert_eq!(p.per_day_details[0].deduction_amount, 500.0);
        assert_eq!(p.total_deductions, 1000.0);
        assert_eq!(p.present_days, 29.0);
    }

    #[test]
    fn late_is_free_unless_policy_says_otherwise() {
        let mut ledger = uniform(6, 2024, AttendanceStatus::Present);
        ledger[3].status = Some(AttendanceStatus::Late);

        let p = priced(6, 2024, 30000.0, &ledger);
        assert_eq!(p.total_deductions, 0.0);
        assert_eq!(p.present_days, 29.0);

        let strict = PayrollPolicy { late_deduction_fraction: 0.25, ..PayrollPolicy::default() };
        let p = generate_payroll("S1", 6, 2024, 30000.0, &ledger, &strict).unwrap();
        assert_eq!(p.total_deductions, 250.0);
    }

    #[test]
    fn leave_types_without_allowance() {
        let ledger = uniform(6, 2024, AttendanceStatus::Present);
        let ledger = with_leave(ledger, &[1], LeaveType::Paid);
        let ledger = with_leave(ledger, &[2], LeaveType::Unpaid);
        let ledger = with_leave(ledger, &[3], LeaveType::Sick);
        let ledger = with_leave(ledger, &[4], LeaveType::Casual);
        let ledger = with_leave(ledger, &[5], LeaveType::Emergency);

        let p = priced(6, 2024, 30000.0, &ledger);

        let deductions: Vec<f64> =
            p.per_day_details[..5].iter().map(|d| d.deduction_amount).collect();
        assert_eq!(deductions, vec![0.0, 1000.0, 1000.0, 1000.0, 1000.0]);
        assert_eq!(p.present_days, 26.0);
    }

    #[test]
    fn allowance_is_consumed_in_date_order() {
        let ledger = uniform(6, 2024, AttendanceStatus::Present);
        let ledger = with_leave(ledger, &[2, 9, 20], LeaveType::Sick);
        let ledger = with_leave(ledger, &[11], LeaveType::Casual);
        let policy = PayrollPolicy {
            leave_allowance: LeaveAllowance { casual: 0, sick: 2, emergency: 0 },
            ..PayrollPolicy::default()
        };

        let p = generate_payroll("S1", 6, 2024, 30000.0, &ledger, &policy).unwrap();

        assert_eq!(p.per_day_details[1].deduction_amount, 0.0);
        assert_eq!(p.per_day_details[8].deduction_amount, 0.0);
        assert_eq!(p.per_day_details[19].deduction_amount, 1000.0);
        assert_eq!(p.per_day_details[10].deduction_amount, 1000.0);
        assert_eq!(p.total_deductions, 2000.0);
    }

    #[test]
    fn identical_inputs_give_identical_records() {
        let mut ledger = uniform(2, 2024, AttendanceStatus::Present);
        ledger[5].status = Some(AttendanceStatus::Absent);
        ledger[6].status = None;
        let policy = PayrollPolicy::default();

        let a = generate_payroll("S1", 2, 2024, 27123.45, &ledger, &policy).unwrap();
        let b = generate_payroll("S1", 2, 2024, 27123.45, &ledger, &policy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_inputs() {
        let ledger = uniform(6, 2024, AttendanceStatus::Present);
        let policy = PayrollPolicy::default();

        assert!(matches!(
            generate_payroll("S1", 6, 2024, -1.0, &ledger, &policy),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            generate_payroll("S1", 6, 2024, f64::NAN, &ledger, &policy),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(
            generate_payroll("S1", 7, 2024, 30000.0, &ledger, &policy).unwrap_err(),
            AppError::LedgerLengthMismatch { expected: 31, actual: 30 }
        );
        assert!(matches!(
            generate_payroll("S1", 13, 2024, 30000.0, &ledger, &policy),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn late_fraction_outside_unit_range_is_rejected() {
        let mut ledger = uniform(6, 2024, AttendanceStatus::Present);
        ledger[3].status = Some(AttendanceStatus::Late);

        for fraction in [-0.5, 1.5, f64::NAN] {
            let policy = PayrollPolicy {
                late_deduction_fraction: fraction,
                ..PayrollPolicy::default()
            };
            assert!(
                matches!(
                    generate_payroll("S1", 6, 2024, 30000.0, &ledger, &policy),
                    Err(AppError::InvalidInput(_))
                ),
                "fraction {fraction}"
            );
        }

        let whole_day = PayrollPolicy { late_deduction_fraction: 1.0, ..PayrollPolicy::default() };
        let p = generate_payroll("S1", 6, 2024, 30000.0, &ledger, &whole_day).unwrap();
        assert_eq!(p.total_deductions, 1000.0);
    }

    #[test]
    fn round2_is_half_up() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(32.258064516), 32.26);
        assert_eq!(round2(0.0), 0.0);
    }

    #[actix_web::test]
    async fn regeneration_replaces_the_stored_record() {
        let store = MemoryStore::new().with_staff("S1", 30000.0);
        let salary = store.staff_salary("S1").await.unwrap();
        let policy = PayrollPolicy::default();

        let first = run_payroll(&store, &salary, 6, 2024, &policy).await.unwrap();
        assert_eq!(first.total_deductions, 30000.0);

        for day in 1..=30 {
            let date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
            mark_day(&store, MarkDay::new("S1", date, AttendanceStatus::Present))
                .await
                .unwrap();
        }
        let second = run_payroll(&store, &salary, 6, 2024, &policy).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.net_salary, 30000.0);
        assert_eq!(store.payroll_count(), 1);
        let listed = store.list_payroll(6, 2024, Some("S1")).await.unwrap();
        assert_eq!(listed, vec![second]);
    }
}
