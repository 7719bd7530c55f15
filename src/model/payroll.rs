use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceStatus, LeaveType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DayDeduction {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: Option<AttendanceStatus>,
    pub leave_type: Option<LeaveType>,
    #[schema(example = 1000.0)]
    pub deduction_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollRecord {
    /// Assigned by the store; `None` until persisted.
    pub id: Option<u64>,

    #[schema(example = "HK-0107")]
    pub staff_id: String,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2024)]
    pub year: i32,

    #[schema(example = 31)]
    pub total_days: u32,

    #[schema(example = 28.0)]
    pub present_days: f64,

    #[schema(example = 31000.0)]
    pub gross_salary: f64,

    pub per_day_details: Vec<DayDeduction>,

    #[schema(example = 3000.0)]
    pub total_deductions: f64,

    /// Not clamped; a negative value is kept as is.
    #[schema(example = 28000.0)]
    pub net_salary: f64,
}
