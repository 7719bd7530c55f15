use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::AppState,
    error::AppError,
    model::attendance::{AttendanceRecord, LedgerDay},
    service::attendance_ledger::{MarkDay, build_ledger, days_in_month, mark_day, parse_mark},
};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = 2)]
    pub month: u32,

    #[schema(example = 2024)]
    pub year: i32,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyAttendanceResponse {
    pub staff_id: String,
    pub month: u32,
    pub year: i32,
    pub total_days: u32,
    /// Sparse, as stored.
    pub records: Vec<AttendanceRecord>,
    /// Dense, one entry per day.
    pub ledger: Vec<LedgerDay>,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkDayRequest {
    #[schema(example = "Leave")]
    pub status: String,

    #[schema(example = "sick", nullable = true)]
    pub leave_type: Option<String>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_in: Option<NaiveDateTime>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_out: Option<NaiveDateTime>,

    /// Revision the caller last saw; 0 for a day it saw unmarked.
    #[schema(example = 1)]
    pub expected_revision: Option<u32>,
}

/// Monthly attendance grid for one staff member
#[utoipa::path(
    get,
    path = "/api/attendance/{staff_id}",
    params(
        ("staff_id", description = "Staff identifier"),
        MonthQuery
    ),
    responses(
        (status = 200, body = MonthlyAttendanceResponse),
        (status = 400, description = "Month out of range"),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Attendance"
)]
pub async fn monthly_attendance(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let staff_id = path.into_inner();
    let MonthQuery { month, year } = query.into_inner();
    let total_days = days_in_month(month, year)?;

    let records = state
        .backend
        .attendance_for_month(&staff_id, month, year)
        .await?;
    let ledger = build_ledger(&staff_id, month, year, &records)?;

    Ok(HttpResponse::Ok().json(MonthlyAttendanceResponse {
        staff_id,
        month,
        year,
        total_days,
        records,
        ledger,
    }))
}

/// Mark or re-mark one day
#[utoipa::path(
    put,
    path = "/api/attendance/{staff_id}/{date}",
    request_body = MarkDayRequest,
    params(
        ("staff_id", description = "Staff identifier"),
        ("date", description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Record created or updated", body = AttendanceRecord),
        (status = 400, description = "Invalid status/leave_type combination", body = Object, example = json!({
            "message": "invalid input: leave_type is required when status is Leave"
        })),
        (status = 404, description = "Staff member not found"),
        (status = 409, description = "Stale expected_revision"),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<MarkDayRequest>,
) -> actix_web::Result<impl Responder> {
    let (staff_id, raw_date) = path.into_inner();
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| AppError::invalid(format!("{raw_date:?} is not a YYYY-MM-DD date")))?;

    let body = body.into_inner();
    let (status, leave_type) = parse_mark(&body.status, body.leave_type.as_deref())?;

    let record = mark_day(
        state.backend.as_ref(),
        MarkDay {
            leave_type,
            time_in: body.time_in,
            time_out: body.time_out,
            expected_revision: body.expected_revision,
            ..MarkDay::new(staff_id, date, status)
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(record))
}
