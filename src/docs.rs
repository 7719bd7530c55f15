use crate::api::attendance::{MarkDayRequest, MonthQuery, MonthlyAttendanceResponse};
use crate::api::payroll::{GeneratePayroll, PayrollListResponse, PayrollQuery};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, LeaveType, LedgerDay};
use crate::model::payroll::{DayDeduction, PayrollRecord};
use crate::model::staff::StaffSalaryConfig;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hotel Staff Payroll API",
        version = "0.1.0",
        description = r#"
## Hotel staff attendance & payroll

Backs the operations dashboard's attendance and payroll pages.

- **Attendance**: a dense monthly grid per staff member. Days are marked
  `Present`, `Absent`, `HalfDay`, `Late` or `Leave` (with a leave type).
  Re-marking a day updates the existing record.
- **Payroll**: monthly payroll priced from the grid. The daily rate is the basic
  salary divided by the days in the month. Regenerating replaces the earlier run.

Errors are returned as `{"message": "..."}`. A `503` means the backend was
unavailable or timed out and the request may be retried.
"#,
    ),
    paths(
        crate::api::attendance::monthly_attendance,
        crate::api::attendance::mark_attendance,

        crate::api::staff::get_salary,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::list_payrolls
    ),
    components(
        schemas(
            AttendanceStatus,
            LeaveType,
            AttendanceRecord,
            LedgerDay,
            MonthQuery,
            MonthlyAttendanceResponse,
            MarkDayRequest,
            StaffSalaryConfig,
            DayDeduction,
            PayrollRecord,
            GeneratePayroll,
            PayrollQuery,
            PayrollListResponse
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance marking and monthly ledger"),
        (name = "Staff", description = "Staff salary configuration (read-only)"),
        (name = "Payroll", description = "Payroll generation and history"),
    )
)]
pub struct ApiDoc;
