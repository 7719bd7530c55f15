use std::time::Duration;

use moka::future::Cache;

use crate::{error::AppResult, model::staff::StaffSalaryConfig, store::Backend};

/// TTL cache in front of salary reads. Failed lookups are not cached.
#[derive(Clone)]
pub struct SalaryCache {
    cache: Cache<String, StaffSalaryConfig>,
}

impl SalaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get_or_fetch(
        &self,
        backend: &dyn Backend,
        staff_id: &str,
    ) -> AppResult<StaffSalaryConfig> {
        self.cache
            .try_get_with(staff_id.to_string(), backend.staff_salary(staff_id))
            .await
            .map_err(|e| (*e).clone())
    }
}
