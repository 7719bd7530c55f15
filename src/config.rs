use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::service::payroll_calculator::{LeaveAllowance, PayrollPolicy, UnmarkedDay};

/// Value of `DATABASE_URL` that selects the in-process store.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub run_migrations: bool,

    // Rate limiting, requests per minute per peer IP; 0 disables it
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Upper bound for any single store call.
    pub backend_timeout: Duration,
    pub salary_cache_ttl: Duration,

    pub payroll_policy: PayrollPolicy,

    /// `MEMORY_STAFF=HK-01:30000,FD-02:25000`, only read by the memory store.
    pub memory_staff: Vec<(String, f64)>,
}

fn parse_staff_list(raw: &str) -> Result<Vec<(String, f64)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, salary) = entry
                .split_once(':')
                .with_context(|| format!("MEMORY_STAFF entry {entry:?} must look like ID:SALARY"))?;
            let salary = salary
                .trim()
                .parse()
                .with_context(|| format!("MEMORY_STAFF entry {entry:?} has a bad salary"))?;
            Ok((id.trim().to_string(), salary))
        })
        .collect()
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let late_deduction_fraction: f64 = var_or("LATE_DEDUCTION_FRACTION", 0.0)?;
        if !(0.0..=1.0).contains(&late_deduction_fraction) {
            anyhow::bail!("LATE_DEDUCTION_FRACTION must be within 0..=1");
        }

        let unmarked = if var_or("UNMARKED_AS_ABSENT", true)? {
            UnmarkedDay::Absent
        } else {
            UnmarkedDay::Ignore
        };

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            run_migrations: var_or("RUN_MIGRATIONS", false)?,

            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            backend_timeout: Duration::from_secs(var_or("BACKEND_TIMEOUT_SECS", 10)?),
            salary_cache_ttl: Duration::from_secs(var_or("SALARY_CACHE_TTL_SECS", 300)?),

            payroll_policy: PayrollPolicy {
                leave_allowance: LeaveAllowance {
                    casual: var_or("LEAVE_ALLOWANCE_CASUAL", 0)?,
                    sick: var_or("LEAVE_ALLOWANCE_SICK", 0)?,
                    emergency: var_or("LEAVE_ALLOWANCE_EMERGENCY", 0)?,
                },
                late_deduction_fraction,
                unmarked,
            },

            memory_staff: parse_staff_list(&env::var("MEMORY_STAFF").unwrap_or_default())?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }
}
