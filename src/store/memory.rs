use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    model::{attendance::AttendanceRecord, payroll::PayrollRecord, staff::StaffSalaryConfig},
    store::Backend,
};

/// In-process store used by tests and by `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryStore {
    salaries: RwLock<HashMap<String, f64>>,
    attendance: RwLock<BTreeMap<(String, NaiveDate), AttendanceRecord>>,
    payroll: RwLock<BTreeMap<(String, i32, u32), PayrollRecord>>,
    next_id: AtomicU64,
    salary_reads: AtomicUsize,
    unavailable: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_staff(self, staff_id: &str, basic_salary: f64) -> Self {
        self.put_staff(staff_id, basic_salary);
        self
    }

    pub fn put_staff(&self, staff_id: &str, basic_salary: f64) {
        write(&self.salaries).insert(staff_id.to_string(), basic_salary);
    }

    /// Number of salary lookups served, for cache assertions.
    #[cfg(test)]
    pub fn salary_reads(&self) -> usize {
        self.salary_reads.load(Ordering::SeqCst)
    }

    /// Simulates an outage: every call fails with `Transient` while set.
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn attendance_count(&self) -> usize {
        read(&self.attendance).len()
    }

    #[cfg(test)]
    pub fn payroll_count(&self) -> usize {
        read(&self.payroll).len()
    }

    fn ensure_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Transient("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn ensure_staff(&self, staff_id: &str) -> AppResult<()> {
        if read(&self.salaries).contains_key(staff_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("staff member {staff_id}")))
        }
    }

    fn assign_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Backend for MemoryStore {
    async fn attendance_for_month(
        &self,
        staff_id: &str,
        month: u32,
        year: i32,
    ) -> AppResult<Vec<AttendanceRecord>> {
        self.ensure_available()?;
        Ok(read(&self.attendance)
            .values()
            .filter(|r| r.staff_id == staff_id && r.date.month() == month && r.date.year() == year)
            .cloned()
            .collect())
    }

    async fn attendance_on(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        self.ensure_available()?;
        Ok(read(&self.attendance)
            .get(&(staff_id.to_string(), date))
            .cloned())
    }

    async fn save_attendance(
        &self,
        mut record: AttendanceRecord,
        expected_revision: Option<u32>,
    ) -> AppResult<AttendanceRecord> {
        self.ensure_available()?;
        self.ensure_staff(&record.staff_id)?;

        // check and write under one lock
        let mut attendance = write(&self.attendance);
        let key = (record.staff_id.clone(), record.date);
        let current = attendance.get(&key);
        let actual = current.map_or(0, |r| r.revision);

        if let Some(expected) = expected_revision.filter(|&e| e != actual) {
            return Err(AppError::Conflict { expected, actual });
        }

        record.id = match current {
            Some(existing) => existing.id,
            None => self.assign_id(),
        };
        record.revision = actual + 1;
        attendance.insert(key, record.clone());
        Ok(record)
    }

    async fn staff_salary(&self, staff_id: &str) -> AppResult<StaffSalaryConfig> {
        self.ensure_available()?;
        self.salary_reads.fetch_add(1, Ordering::SeqCst);
        read(&self.salaries)
            .get(staff_id)
            .map(|&basic_salary| StaffSalaryConfig {
                staff_id: staff_id.to_string(),
                basic_salary,
            })
            .ok_or_else(|| AppError::NotFound(format!("staff member {staff_id}")))
    }

    async fn save_payroll(&self, mut record: PayrollRecord) -> AppResult<PayrollRecord> {
        self.ensure_available()?;
        self.ensure_staff(&record.staff_id)?;

        let mut payroll = write(&self.payroll);
        let key = (record.staff_id.clone(), record.year, record.month);
        record.id = match payroll.get(&key).and_then(|existing| existing.id) {
            Some(id) => Some(id),
            None => Some(self.assign_id()),
        };
        payroll.insert(key, record.clone());
        Ok(record)
    }

    async fn list_payroll(
        &self,
        month: u32,
        year: i32,
        staff_id: Option<&str>,
    ) -> AppResult<Vec<PayrollRecord>> {
        self.ensure_available()?;
        Ok(read(&self.payroll)
            .values()
            .filter(|p| p.month == month && p.year == year)
            .filter(|p| staff_id.is_none_or(|id| p.staff_id == id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn record(staff_id: &str, date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            staff_id: staff_id.to_string(),
            date,
            status,
            leave_type: None,
            time_in: None,
            time_out: None,
            revision: 1,
        }
    }

    #[actix_web::test]
    async fn save_attendance_keeps_identity_per_day() {
        let store = MemoryStore::new().with_staff("FD-01", 30000.0);
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let first = store
            .save_attendance(record("FD-01", date, AttendanceStatus::Present), None)
            .await
            .unwrap();
        let second = store
            .save_attendance(record("FD-01", date, AttendanceStatus::Late), None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!((first.revision, second.revision), (1, 2));
        assert_eq!(store.attendance_count(), 1);
        let stored = store.attendance_on("FD-01", date).await.unwrap().unwrap();
        assert_eq!(stored.status, AttendanceStatus::Late);
    }

    #[actix_web::test]
    async fn unknown_staff_is_not_found() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let err = store
            .save_attendance(record("nobody", date, AttendanceStatus::Present), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            store.staff_salary("nobody").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn month_query_filters_other_months_and_staff() {
        let store = MemoryStore::new()
            .with_staff("FD-01", 30000.0)
            .with_staff("HK-02", 25000.0);
        let in_march = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let in_april = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

        for (staff, date) in [("FD-01", in_march), ("FD-01", in_april), ("HK-02", in_march)] {
            store
                .save_attendance(record(staff, date, AttendanceStatus::Present), None)
                .await
                .unwrap();
        }

        let march = store.attendance_for_month("FD-01", 3, 2024).await.unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].date, in_march);
    }

    #[actix_web::test]
    async fn guarded_write_compares_revision_under_the_lock() {
        let store = MemoryStore::new().with_staff("FD-01", 30000.0);
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        store
            .save_attendance(record("FD-01", date, AttendanceStatus::Present), Some(0))
            .await
            .unwrap();

        let err = store
            .save_attendance(record("FD-01", date, AttendanceStatus::Absent), Some(0))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Conflict { expected: 0, actual: 1 });

        let saved = store
            .save_attendance(record("FD-01", date, AttendanceStatus::Late), Some(1))
            .await
            .unwrap();
        assert_eq!(saved.revision, 2);

        let stored = store.attendance_on("FD-01", date).await.unwrap().unwrap();
        assert_eq!(stored.status, AttendanceStatus::Late);
    }

    #[actix_web::test]
    async fn outage_surfaces_as_transient() {
        let store = MemoryStore::new().with_staff("FD-01", 30000.0);
        store.set_unavailable(true);

        let err = store.staff_salary("FD-01").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
