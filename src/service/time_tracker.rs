use std::sync::Arc;

use tracing::{info, warn};

use super::aggregator::DailyHoursAggregator;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::time_log::TimeLog;
use crate::store::WorkStore;

/// Opens and closes work intervals; every close refreshes the day's total.
pub struct TimeTracker {
    store: Arc<dyn WorkStore>,
    aggregator: Arc<DailyHoursAggregator>,
    clock: Arc<dyn Clock>,
}

impl TimeTracker {
    pub fn new(
        store: Arc<dyn WorkStore>,
        aggregator: Arc<DailyHoursAggregator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            aggregator,
            clock,
        }
    }

    /// `Conflict` while another log of the assignment is still open.
    pub async fn start(&self, assignment_id: u64, note: Option<&str>) -> AppResult<TimeLog> {
        if self.store.get_assignment(assignment_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Assignment {} not found", assignment_id)));
        }

        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let log = self
            .store
            .open_time_log(assignment_id, note, self.clock.now())
            .await?;
        info!(log_id = log.id, assignment_id, "Time log started");
        Ok(log)
    }

    /// Closing an already closed log returns it unchanged.
    pub async fn stop(&self, log_id: u64) -> AppResult<TimeLog> {
        let log = self.store.close_time_log(log_id, self.clock.now()).await?;
        info!(log_id, assignment_id = log.assignment_id, "Time log stopped");

        let Some(assignment) = self.store.get_assignment(log.assignment_id).await? else {
            warn!(log_id, assignment_id = log.assignment_id, "Time log has no assignment, hours not updated");
            return Ok(log);
        };

        // The close is already committed; a stale total is repaired by the recompute endpoints.
        if let Err(e) = self
            .aggregator
            .recompute(assignment.employee_id, log.start_time.date())
            .await
        {
            warn!(
                log_id,
                employee_id = assignment.employee_id,
                error = %e,
                "Daily hours recompute failed"
            );
        }
        Ok(log)
    }

    pub async fn list_for_assignment(&self, assignment_id: u64) -> AppResult<Vec<TimeLog>> {
        Ok(self.store.time_logs_for_assignment(assignment_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::assignment::{Assignment, AssignmentStatus};
    use crate::model::work_hours::DailyWorkHours;
    use crate::store::StoreResult;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, TimeTracker) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let aggregator = Arc::new(DailyHoursAggregator::new(store.clone(), clock.clone()));
        let tracker = TimeTracker::new(store.clone(), aggregator, clock.clone());
        (store, clock, tracker)
    }

    #[actix_web::test]
    async fn second_start_conflicts() {
        let (store, _clock, tracker) = setup();
        let a = store.insert_assignment(7, 100, at(8, 0)).await.unwrap();

        tracker.start(a.id, Some("Brake pads")).await.unwrap();
        let err = tracker.start(a.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let logs = tracker.list_for_assignment(a.id).await.unwrap();
        assert_eq!(logs.iter().filter(|l| l.is_open()).count(), 1);
        assert_eq!(logs[0].note.as_deref(), Some("Brake pads"));
    }

    #[actix_web::test]
    async fn start_needs_an_assignment() {
        let (_store, _clock, tracker) = setup();
        let err = tracker.start(42, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn stop_adds_exact_interval_once() {
        let (store, clock, tracker) = setup();
        let a = store.insert_assignment(7, 100, at(8, 0)).await.unwrap();

        let log = tracker.start(a.id, None).await.unwrap();
        clock.advance(Duration::minutes(90));
        let closed = tracker.stop(log.id).await.unwrap();
        assert_eq!(closed.end_time, Some(at(10, 30)));

        clock.advance(Duration::minutes(30));
        let again = tracker.stop(log.id).await.unwrap();
        assert_eq!(again.end_time, Some(at(10, 30)));

        let day = store.daily_hours(7).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].total_seconds, 5400);
        assert_eq!(day[0].log_count, 1);
    }

    #[actix_web::test]
    async fn restart_after_stop_is_allowed() {
        let (store, clock, tracker) = setup();
        let a = store.insert_assignment(7, 100, at(8, 0)).await.unwrap();

        let first = tracker.start(a.id, None).await.unwrap();
        clock.advance(Duration::minutes(10));
        tracker.stop(first.id).await.unwrap();
        let second = tracker.start(a.id, Some("  ")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.note, None);
        let ids: Vec<u64> = tracker
            .list_for_assignment(a.id)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[actix_web::test]
    async fn stop_unknown_log_is_not_found() {
        let (_store, _clock, tracker) = setup();
        let err = tracker.stop(5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Memory store whose first daily-hours rebuild waits for `release`.
    #[derive(Default)]
    struct SlowRebuild {
        inner: MemoryStore,
        held: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl WorkStore for SlowRebuild {
        async fn claim_least_loaded(
            &self,
            appointment_id: u64,
            candidates: &[u64],
            now: NaiveDateTime,
        ) -> StoreResult<Assignment> {
            self.inner.claim_least_loaded(appointment_id, candidates, now).await
        }

        async fn insert_assignment(
            &self,
            employee_id: u64,
            appointment_id: u64,
            now: NaiveDateTime,
        ) -> StoreResult<Assignment> {
            self.inner.insert_assignment(employee_id, appointment_id, now).await
        }

        async fn get_assignment(&self, id: u64) -> StoreResult<Option<Assignment>> {
            self.inner.get_assignment(id).await
        }

        async fn assignments_for_employee(&self, employee_id: u64) -> StoreResult<Vec<Assignment>> {
            self.inner.assignments_for_employee(employee_id).await
        }

        async fn active_assignment_for_appointment(
            &self,
            appointment_id: u64,
        ) -> StoreResult<Option<Assignment>> {
            self.inner.active_assignment_for_appointment(appointment_id).await
        }

        async fn transition_assignment(
            &self,
            id: u64,
            from: AssignmentStatus,
            to: AssignmentStatus,
            now: NaiveDateTime,
        ) -> StoreResult<Assignment> {
            self.inner.transition_assignment(id, from, to, now).await
        }

        async fn open_time_log(
            &self,
            assignment_id: u64,
            note: Option<&str>,
            now: NaiveDateTime,
        ) -> StoreResult<TimeLog> {
            self.inner.open_time_log(assignment_id, note, now).await
        }

        async fn close_time_log(&self, log_id: u64, now: NaiveDateTime) -> StoreResult<TimeLog> {
            self.inner.close_time_log(log_id, now).await
        }

        async fn time_logs_for_assignment(&self, assignment_id: u64) -> StoreResult<Vec<TimeLog>> {
            self.inner.time_logs_for_assignment(assignment_id).await
        }

        async fn recompute_daily_hours(
            &self,
            employee_id: u64,
            date: NaiveDate,
            now: NaiveDateTime,
        ) -> StoreResult<DailyWorkHours> {
            if !self.held.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.recompute_daily_hours(employee_id, date, now).await
        }

        async fn daily_hours(&self, employee_id: u64) -> StoreResult<Vec<DailyWorkHours>> {
            self.inner.daily_hours(employee_id).await
        }

        async fn daily_hours_range(
            &self,
            employee_id: u64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> StoreResult<Vec<DailyWorkHours>> {
            self.inner.daily_hours_range(employee_id, start, end).await
        }
    }

    #[actix_web::test]
    async fn overlapping_stops_of_one_employee_count_both_logs_exactly() {
        let store = Arc::new(SlowRebuild::default());
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let aggregator = Arc::new(DailyHoursAggregator::new(store.clone(), clock.clone()));
        let tracker = Arc::new(TimeTracker::new(store.clone(), aggregator, clock.clone()));

        let a = store.insert_assignment(7, 100, at(8, 0)).await.unwrap();
        let b = store.insert_assignment(7, 101, at(8, 0)).await.unwrap();
        let first_log = tracker.start(a.id, None).await.unwrap();
        let second_log = tracker.start(b.id, None).await.unwrap();

        clock.set(at(10, 0));
        let first_stop = actix_web::rt::spawn({
            let tracker = tracker.clone();
            async move { tracker.stop(first_log.id).await }
        });
        store.entered.notified().await;

        clock.set(at(11, 0));
        tracker.stop(second_log.id).await.unwrap();
        store.release.notify_one();
        first_stop.await.unwrap().unwrap();

        let day = store.daily_hours(7).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].total_seconds, 3600 + 7200);
        assert_eq!(day[0].log_count, 2);
    }
}
