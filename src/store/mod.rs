//! Persistence seam for assignments, time logs and daily aggregates.
//!
//! Every method is one logical write or read against the core's own tables.
//! The check-then-act sequences of the engine (least-busy claim, one open log
//! per assignment, one active assignment per appointment, daily totals) are
//! enforced here, inside a single critical section or transaction, never by
//! the caller.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;

use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::time_log::TimeLog;
use crate::model::work_hours::DailyWorkHours;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "storage error: {}", _0)]
    Database(String),
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Atomically scores `candidates` by their ASSIGNED + IN_PROGRESS count,
    /// picks the least loaded one (earlier entries win ties) and inserts an
    /// ASSIGNED row for it. Concurrent claims over overlapping candidate sets
    /// are serialized. Fails `Conflict` if the appointment is already held.
    async fn claim_least_loaded(
        &self,
        appointment_id: u64,
        candidates: &[u64],
        now: NaiveDateTime,
    ) -> StoreResult<Assignment>;

    /// Inserts an ASSIGNED row for a specific employee. Fails `Conflict` if
    /// the appointment is already held by an active assignment.
    async fn insert_assignment(
        &self,
        employee_id: u64,
        appointment_id: u64,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment>;

    async fn get_assignment(&self, id: u64) -> StoreResult<Option<Assignment>>;

    /// All assignments of an employee, oldest first.
    async fn assignments_for_employee(&self, employee_id: u64) -> StoreResult<Vec<Assignment>>;

    async fn active_assignment_for_appointment(
        &self,
        appointment_id: u64,
    ) -> StoreResult<Option<Assignment>>;

    /// Compare-and-swap on status: succeeds only while the row still holds
    /// `from`. `NotFound` if the row is missing, `Conflict` if it moved.
    async fn transition_assignment(
        &self,
        id: u64,
        from: AssignmentStatus,
        to: AssignmentStatus,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment>;

    /// Inserts an open log. `Conflict` if the assignment already has one,
    /// `NotFound` if the assignment does not exist.
    async fn open_time_log(
        &self,
        assignment_id: u64,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> StoreResult<TimeLog>;

    /// Sets `end_time` if the log is still open and returns the stored row.
    /// A log that is already closed is returned unchanged.
    async fn close_time_log(&self, log_id: u64, now: NaiveDateTime) -> StoreResult<TimeLog>;

    /// Logs of one assignment in insertion order.
    async fn time_logs_for_assignment(&self, assignment_id: u64) -> StoreResult<Vec<TimeLog>>;

    /// Rebuilds the (employee, day) aggregate from the employee's logs that
    /// started on `date`, measuring open ones up to `now`. The logs are read
    /// and the row written in one critical section. A day with no logs is
    /// removed, so only days with data are ever listed.
    async fn recompute_daily_hours(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> StoreResult<DailyWorkHours>;

    async fn daily_hours(&self, employee_id: u64) -> StoreResult<Vec<DailyWorkHours>>;

    /// Inclusive on both ends, ordered by day.
    async fn daily_hours_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyWorkHours>>;
}
