pub mod attendance_ledger;
pub mod payroll_calculator;
