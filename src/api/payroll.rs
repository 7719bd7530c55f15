use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::AppState,
    model::payroll::PayrollRecord,
    service::{attendance_ledger::days_in_month, payroll_calculator::run_payroll},
};

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = "HK-0107")]
    pub staff_id: String,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2024)]
    pub year: i32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2024)]
    pub year: i32,

    #[schema(example = "HK-0107")]
    pub staff_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PayrollListResponse {
    pub data: Vec<PayrollRecord>,
    pub month: u32,
    pub year: i32,
    pub total: usize,
}

/// Generate (or regenerate) payroll for one staff member and month
#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 201, description = "Payroll stored, replacing any earlier run", body = PayrollRecord),
        (status = 400, description = "Invalid month or salary"),
        (status = 404, description = "Staff member not found"),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    state: web::Data<AppState>,
    payload: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    let GeneratePayroll {
        staff_id,
        month,
        year,
    } = payload.into_inner();
    days_in_month(month, year)?;

    let salary = state
        .salaries
        .get_or_fetch(state.backend.as_ref(), &staff_id)
        .await?;

    let payroll = run_payroll(state.backend.as_ref(), &salary, month, year, &state.policy).await?;

    Ok(HttpResponse::Created().json(payroll))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PayrollListResponse),
        (status = 400, description = "Month out of range")
    ),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    state: web::Data<AppState>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    let PayrollQuery {
        month,
        year,
        staff_id,
    } = query.into_inner();
    days_in_month(month, year)?;

    let data = state
        .backend
        .list_payroll(month, year, staff_id.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(PayrollListResponse {
        total: data.len(),
        data,
        month,
        year,
    }))
}
