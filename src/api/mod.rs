use std::sync::Arc;

use crate::{
    service::payroll_calculator::PayrollPolicy, store::Backend, utils::salary_cache::SalaryCache,
};

pub mod attendance;
pub mod payroll;
pub mod staff;

/// Shared handler state, registered once as `web::Data<AppState>`.
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub salaries: SalaryCache,
    pub policy: PayrollPolicy,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, salaries: SalaryCache, policy: PayrollPolicy) -> Self {
        Self {
            backend,
            salaries,
            policy,
        }
    }
}
