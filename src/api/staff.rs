use actix_web::{HttpResponse, Responder, web};

use crate::{api::AppState, model::staff::StaffSalaryConfig};

/// Salary configuration as seen by payroll (cached)
#[utoipa::path(
    get,
    path = "/api/staff/{staff_id}/salary",
    params(
        ("staff_id", description = "Staff identifier")
    ),
    responses(
        (status = 200, body = StaffSalaryConfig),
        (status = 404, description = "Staff member not found", body = Object, example = json!({
            "message": "staff member HK-0107 not found"
        })),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Staff"
)]
pub async fn get_salary(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let staff_id = path.into_inner();
    let salary = state
        .salaries
        .get_or_fetch(state.backend.as_ref(), &staff_id)
        .await?;

    Ok(HttpResponse::Ok().json(salary))
}
