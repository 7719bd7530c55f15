use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffSalaryConfig {
    #[schema(example = "HK-0107")]
    pub staff_id: String,

    #[schema(example = 30000.0)]
    pub basic_salary: f64,
}
