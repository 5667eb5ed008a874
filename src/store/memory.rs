//! In-process store; one mutex over all tables gives every method the same
//! atomicity the MySQL transactions provide.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::{StoreError, StoreResult, WorkStore};
use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::time_log::TimeLog;
use crate::model::work_hours::DailyWorkHours;
use crate::service::selector::pick_least_loaded;

#[derive(Default)]
struct Tables {
    assignments: Vec<Assignment>,
    time_logs: Vec<TimeLog>,
    daily_hours: BTreeMap<(u64, NaiveDate), DailyWorkHours>,
    next_assignment_id: u64,
    next_time_log_id: u64,
}

impl Tables {
    fn active_load(&self) -> HashMap<u64, u32> {
        let mut load = HashMap::new();
        for a in self.assignments.iter().filter(|a| a.status.is_active()) {
            *load.entry(a.employee_id).or_insert(0) += 1;
        }
        load
    }

    fn ensure_appointment_free(&self, appointment_id: u64) -> StoreResult<()> {
        if self
            .assignments
            .iter()
            .any(|a| a.appointment_id == appointment_id && a.status.is_active())
        {
            return Err(StoreError::Conflict(format!(
                "Appointment {} already has an active assignment",
                appointment_id
            )));
        }
        Ok(())
    }

    fn push_assignment(&mut self, employee_id: u64, appointment_id: u64, now: NaiveDateTime) -> Assignment {
        self.next_assignment_id += 1;
        let assignment = Assignment {
            id: self.next_assignment_id,
            appointment_id,
            employee_id,
            status: AssignmentStatus::Assigned,
            created_at: now,
            updated_at: now,
        };
        self.assignments.push(assignment.clone());
        assignment
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // mutations are single pushes or field writes, so a poisoned lock still guards whole rows
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl WorkStore for MemoryStore {
    async fn claim_least_loaded(
        &self,
        appointment_id: u64,
        candidates: &[u64],
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        let mut tables = self.lock();
        tables.ensure_appointment_free(appointment_id)?;

        let load = tables.active_load();
        let employee_id = pick_least_loaded(candidates, |id| load.get(&id).copied().unwrap_or(0))
            .ok_or_else(|| StoreError::NotFound("No candidate employees to claim".to_string()))?;

        Ok(tables.push_assignment(employee_id, appointment_id, now))
    }

    async fn insert_assignment(
        &self,
        employee_id: u64,
        appointment_id: u64,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        let mut tables = self.lock();
        tables.ensure_appointment_free(appointment_id)?;
        Ok(tables.push_assignment(employee_id, appointment_id, now))
    }

    async fn get_assignment(&self, id: u64) -> StoreResult<Option<Assignment>> {
        Ok(self.lock().assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn assignments_for_employee(&self, employee_id: u64) -> StoreResult<Vec<Assignment>> {
        Ok(self
            .lock()
            .assignments
            .iter()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn active_assignment_for_appointment(
        &self,
        appointment_id: u64,
    ) -> StoreResult<Option<Assignment>> {
        Ok(self
            .lock()
            .assignments
            .iter()
            .find(|a| a.appointment_id == appointment_id && a.status.is_active())
            .cloned())
    }

    async fn transition_assignment(
        &self,
        id: u64,
        from: AssignmentStatus,
        to: AssignmentStatus,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        let mut tables = self.lock();
        let row = tables
            .assignments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Assignment {} not found", id)))?;

        if row.status != from {
            return Err(StoreError::Conflict(format!(
                "Assignment {} changed to {} concurrently",
                id, row.status
            )));
        }
        row.status = to;
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn open_time_log(
        &self,
        assignment_id: u64,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> StoreResult<TimeLog> {
        let mut tables = self.lock();
        if !tables.assignments.iter().any(|a| a.id == assignment_id) {
            return Err(StoreError::NotFound(format!(
                "Assignment {} not found",
                assignment_id
            )));
        }
        if tables
            .time_logs
            .iter()
            .any(|l| l.assignment_id == assignment_id && l.is_open())
        {
            return Err(StoreError::Conflict(format!(
                "Active TimeLog already exists for assignment {}",
                assignment_id
            )));
        }

        tables.next_time_log_id += 1;
        let log = TimeLog {
            id: tables.next_time_log_id,
            assignment_id,
            start_time: now,
            end_time: None,
            note: note.map(str::to_string),
        };
        tables.time_logs.push(log.clone());
        Ok(log)
    }

    async fn close_time_log(&self, log_id: u64, now: NaiveDateTime) -> StoreResult<TimeLog> {
        let mut tables = self.lock();
        let log = tables
            .time_logs
            .iter_mut()
            .find(|l| l.id == log_id)
            .ok_or_else(|| StoreError::NotFound(format!("TimeLog {} not found", log_id)))?;

        if log.end_time.is_none() {
            log.end_time = Some(now);
        }
        Ok(log.clone())
    }

    async fn time_logs_for_assignment(&self, assignment_id: u64) -> StoreResult<Vec<TimeLog>> {
        Ok(self
            .lock()
            .time_logs
            .iter()
            .filter(|l| l.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn recompute_daily_hours(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> StoreResult<DailyWorkHours> {
        let mut tables = self.lock();
        let logs: Vec<TimeLog> = tables
            .time_logs
            .iter()
            .filter(|l| l.start_time.date() == date)
            .filter(|l| {
                tables
                    .assignments
                    .iter()
                    .any(|a| a.id == l.assignment_id && a.employee_id == employee_id)
            })
            .cloned()
            .collect();

        let row = DailyWorkHours::from_logs(employee_id, date, &logs, now);
        let key = (employee_id, date);
        if row.log_count == 0 {
            tables.daily_hours.remove(&key);
        } else {
            tables.daily_hours.insert(key, row.clone());
        }
        Ok(row)
    }

    async fn daily_hours(&self, employee_id: u64) -> StoreResult<Vec<DailyWorkHours>> {
        Ok(self
            .lock()
            .daily_hours
            .range((employee_id, NaiveDate::MIN)..=(employee_id, NaiveDate::MAX))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn daily_hours_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyWorkHours>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .lock()
            .daily_hours
            .range((employee_id, start)..=(employee_id, end))
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[actix_web::test]
    async fn claim_prefers_lowest_load_then_enumeration_order() {
        let store = MemoryStore::new();
        store.insert_assignment(1, 100, at(8, 0)).await.unwrap();
        store.insert_assignment(1, 101, at(8, 0)).await.unwrap();

        let a = store.claim_least_loaded(200, &[1, 2, 3], at(9, 0)).await.unwrap();
        assert_eq!(a.employee_id, 2);
        let b = store.claim_least_loaded(201, &[1, 2, 3], at(9, 0)).await.unwrap();
        assert_eq!(b.employee_id, 3);
    }

    #[actix_web::test]
    async fn concurrent_claims_spread_over_candidates() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for appt in 0..4u64 {
            let store = store.clone();
            handles.push(actix_web::rt::spawn(async move {
                store.claim_least_loaded(500 + appt, &[1, 2], at(9, 0)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let one = store.assignments_for_employee(1).await.unwrap().len();
        let two = store.assignments_for_employee(2).await.unwrap().len();
        assert_eq!((one, two), (2, 2));
    }

    #[actix_web::test]
    async fn second_active_assignment_for_appointment_conflicts() {
        let store = MemoryStore::new();
        let first = store.insert_assignment(1, 100, at(8, 0)).await.unwrap();
        assert!(matches!(
            store.claim_least_loaded(100, &[2], at(8, 5)).await,
            Err(StoreError::Conflict(_))
        ));

        store
            .transition_assignment(first.id, AssignmentStatus::Assigned, AssignmentStatus::Cancelled, at(8, 10))
            .await
            .unwrap();
        let again = store.insert_assignment(2, 100, at(8, 15)).await.unwrap();
        assert_eq!(again.employee_id, 2);
    }

    #[actix_web::test]
    async fn transition_is_compare_and_swap() {
        let store = MemoryStore::new();
        let a = store.insert_assignment(1, 100, at(8, 0)).await.unwrap();
        let moved = store
            .transition_assignment(a.id, AssignmentStatus::Assigned, AssignmentStatus::InProgress, at(9, 0))
            .await
            .unwrap();
        assert_eq!(moved.updated_at, at(9, 0));

        let stale = store
            .transition_assignment(a.id, AssignmentStatus::Assigned, AssignmentStatus::Cancelled, at(9, 5))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));
        assert!(matches!(
            store
                .transition_assignment(99, AssignmentStatus::Assigned, AssignmentStatus::Cancelled, at(9, 5))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn one_open_log_per_assignment() {
        let store = MemoryStore::new();
        let a = store.insert_assignment(1, 100, at(8, 0)).await.unwrap();
        let log = store.open_time_log(a.id, Some("diag"), at(9, 0)).await.unwrap();
        assert!(matches!(
            store.open_time_log(a.id, None, at(9, 1)).await,
            Err(StoreError::Conflict(_))
        ));

        let closed = store.close_time_log(log.id, at(10, 0)).await.unwrap();
        assert_eq!(closed.end_time, Some(at(10, 0)));
        let again = store.close_time_log(log.id, at(11, 0)).await.unwrap();
        assert_eq!(again.end_time, Some(at(10, 0)));

        store.open_time_log(a.id, None, at(11, 0)).await.unwrap();
        assert!(matches!(
            store.open_time_log(42, None, at(11, 0)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn recompute_keeps_only_days_with_logs() {
        let store = MemoryStore::new();
        let day = at(0, 0).date();
        let a = store.insert_assignment(7, 100, at(8, 0)).await.unwrap();
        let other = store.insert_assignment(8, 101, at(8, 0)).await.unwrap();
        let log = store.open_time_log(a.id, None, at(9, 0)).await.unwrap();
        store.close_time_log(log.id, at(9, 45)).await.unwrap();
        store.open_time_log(other.id, None, at(9, 0)).await.unwrap();

        let row = store.recompute_daily_hours(7, day, at(12, 0)).await.unwrap();
        assert_eq!((row.total_seconds, row.log_count), (2700, 1));
        assert_eq!(store.daily_hours(7).await.unwrap(), vec![row]);

        let next = day.succ_opt().unwrap();
        let empty = store.recompute_daily_hours(7, next, at(12, 0)).await.unwrap();
        assert_eq!(empty.log_count, 0);
        assert_eq!(store.daily_hours_range(7, day, next).await.unwrap().len(), 1);
    }
}
