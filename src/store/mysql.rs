//! MySQL store. The claim paths run in READ COMMITTED transactions that lock
//! one `employee_claim_locks` row per candidate, in primary-key order, before
//! counting workload, so two claims touching the same employee serialize.
//! Daily-hour rebuilds take the same lock for their one employee, so two
//! rebuilds of one day never write out of order.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Connection, MySqlConnection, MySqlPool};
use tracing::{debug, warn};

use super::{StoreError, StoreResult, WorkStore};
use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::time_log::TimeLog;
use crate::model::work_hours::DailyWorkHours;
use crate::service::selector::pick_least_loaded;
use crate::utils::db_utils::{classify, db_error, is_retryable, placeholders};

/// Attempts per locked transaction before a deadlock is reported.
const LOCK_ATTEMPTS: usize = 3;

const ASSIGNMENT_COLUMNS: &str = "id, appointment_id, employee_id, status, created_at, updated_at";
const TIME_LOG_COLUMNS: &str = "id, assignment_id, start_time, end_time, note";

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: u64,
    appointment_id: u64,
    employee_id: u64,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = StoreError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AssignmentStatus>().map_err(|_| {
            StoreError::Database(format!(
                "assignment {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Assignment {
            id: row.id,
            appointment_id: row.appointment_id,
            employee_id: row.employee_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_assignment(&self, id: u64) -> StoreResult<Option<Assignment>> {
        let sql = format!("SELECT {} FROM assignments WHERE id = ?", ASSIGNMENT_COLUMNS);
        sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Assignment::try_from)
            .transpose()
    }

    async fn fetch_time_log(&self, id: u64) -> StoreResult<Option<TimeLog>> {
        let sql = format!("SELECT {} FROM time_logs WHERE id = ?", TIME_LOG_COLUMNS);
        sqlx::query_as::<_, TimeLog>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn claim_once(
        &self,
        appointment_id: u64,
        candidates: &[u64],
        now: NaiveDateTime,
    ) -> Result<Assignment, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        set_read_committed(&mut conn).await?;
        let mut tx = conn.begin().await?;
        lock_employees(&mut tx, candidates).await?;

        let count_sql = format!(
            "SELECT employee_id, COUNT(*) FROM assignments \
             WHERE status IN ('ASSIGNED', 'IN_PROGRESS') AND employee_id IN ({}) \
             GROUP BY employee_id",
            placeholders(candidates.len())
        );
        let mut count_query = sqlx::query_as::<_, (u64, i64)>(&count_sql);
        for id in candidates {
            count_query = count_query.bind(id);
        }
        let counts = count_query.fetch_all(&mut *tx).await?;

        let employee_id = pick_least_loaded(candidates, |id| {
            counts
                .iter()
                .find(|(emp, _)| *emp == id)
                .map_or(0, |(_, n)| *n as u32)
        })
        .ok_or(sqlx::Error::RowNotFound)?;
        debug!(appointment_id, employee_id, ?counts, "Workload scored under lock");

        let assignment = insert_assigned(&mut tx, employee_id, appointment_id, now).await?;
        tx.commit().await?;
        Ok(assignment)
    }

    async fn insert_once(
        &self,
        employee_id: u64,
        appointment_id: u64,
        now: NaiveDateTime,
    ) -> Result<Assignment, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        set_read_committed(&mut conn).await?;
        let mut tx = conn.begin().await?;
        lock_employees(&mut tx, &[employee_id]).await?;
        let assignment = insert_assigned(&mut tx, employee_id, appointment_id, now).await?;
        tx.commit().await?;
        Ok(assignment)
    }

    async fn recompute_once(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<DailyWorkHours, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        set_read_committed(&mut conn).await?;
        let mut tx = conn.begin().await?;
        lock_employees(&mut tx, &[employee_id]).await?;

        let day_start = date.and_time(NaiveTime::MIN);
        let logs = sqlx::query_as::<_, TimeLog>(
            r#"
            SELECT t.id, t.assignment_id, t.start_time, t.end_time, t.note
            FROM time_logs t
            JOIN assignments a ON a.id = t.assignment_id
            WHERE a.employee_id = ?
            AND t.start_time >= ?
            AND t.start_time < ?
            ORDER BY t.id
            "#,
        )
        .bind(employee_id)
        .bind(day_start)
        .bind(day_start + Duration::days(1))
        .fetch_all(&mut *tx)
        .await?;

        let row = DailyWorkHours::from_logs(employee_id, date, &logs, now);
        if row.log_count == 0 {
            sqlx::query("DELETE FROM daily_work_hours WHERE employee_id = ? AND work_date = ?")
                .bind(employee_id)
                .bind(date)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO daily_work_hours (employee_id, work_date, total_seconds, log_count)
                VALUES (?, ?, ?, ?) AS incoming
                ON DUPLICATE KEY UPDATE
                    total_seconds = incoming.total_seconds,
                    log_count = incoming.log_count
                "#,
            )
            .bind(row.employee_id)
            .bind(row.work_date)
            .bind(row.total_seconds)
            .bind(row.log_count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }
}

/// Applies to the next transaction started on this connection only.
async fn set_read_committed(conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Ensures a lock row exists for every id, then takes them all FOR UPDATE.
async fn lock_employees(conn: &mut MySqlConnection, ids: &[u64]) -> Result<(), sqlx::Error> {
    let mut ordered = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let insert_sql = format!(
        "INSERT IGNORE INTO employee_claim_locks (employee_id) VALUES {}",
        vec!["(?)"; ordered.len()].join(", ")
    );
    let mut insert = sqlx::query(&insert_sql);
    for id in &ordered {
        insert = insert.bind(id);
    }
    insert.execute(&mut *conn).await?;

    let lock_sql = format!(
        "SELECT employee_id FROM employee_claim_locks WHERE employee_id IN ({}) \
         ORDER BY employee_id FOR UPDATE",
        placeholders(ordered.len())
    );
    let mut lock = sqlx::query(&lock_sql);
    for id in &ordered {
        lock = lock.bind(id);
    }
    lock.fetch_all(&mut *conn).await?;
    Ok(())
}

async fn insert_assigned(
    conn: &mut MySqlConnection,
    employee_id: u64,
    appointment_id: u64,
    now: NaiveDateTime,
) -> Result<Assignment, sqlx::Error> {
    let status = AssignmentStatus::Assigned;
    let result = sqlx::query(
        r#"
        INSERT INTO assignments (appointment_id, employee_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(appointment_id)
    .bind(employee_id)
    .bind(status.as_ref())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Assignment {
        id: result.last_insert_id(),
        appointment_id,
        employee_id,
        status,
        created_at: now,
        updated_at: now,
    })
}

fn appointment_taken(appointment_id: u64) -> impl FnOnce() -> String {
    move || format!("Appointment {} already has an active assignment", appointment_id)
}

#[async_trait]
impl WorkStore for MySqlStore {
    async fn claim_least_loaded(
        &self,
        appointment_id: u64,
        candidates: &[u64],
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        if candidates.is_empty() {
            return Err(StoreError::NotFound("No candidate employees to claim".to_string()));
        }

        let mut attempt = 1;
        loop {
            match self.claim_once(appointment_id, candidates, now).await {
                Ok(assignment) => return Ok(assignment),
                Err(e) if is_retryable(&e) && attempt < LOCK_ATTEMPTS => {
                    warn!(error = %e, appointment_id, attempt, "Claim lost a lock race, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(classify(e, appointment_taken(appointment_id))),
            }
        }
    }

    async fn insert_assignment(
        &self,
        employee_id: u64,
        appointment_id: u64,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        let mut attempt = 1;
        loop {
            match self.insert_once(employee_id, appointment_id, now).await {
                Ok(assignment) => return Ok(assignment),
                Err(e) if is_retryable(&e) && attempt < LOCK_ATTEMPTS => {
                    warn!(error = %e, appointment_id, employee_id, attempt, "Assign lost a lock race, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(classify(e, appointment_taken(appointment_id))),
            }
        }
    }

    async fn get_assignment(&self, id: u64) -> StoreResult<Option<Assignment>> {
        self.fetch_assignment(id).await
    }

    async fn assignments_for_employee(&self, employee_id: u64) -> StoreResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {} FROM assignments WHERE employee_id = ? ORDER BY id",
            ASSIGNMENT_COLUMNS
        );
        sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(Assignment::try_from)
            .collect()
    }

    async fn active_assignment_for_appointment(
        &self,
        appointment_id: u64,
    ) -> StoreResult<Option<Assignment>> {
        let sql = format!(
            "SELECT {} FROM assignments WHERE active_appointment_id = ?",
            ASSIGNMENT_COLUMNS
        );
        sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(appointment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Assignment::try_from)
            .transpose()
    }

    async fn transition_assignment(
        &self,
        id: u64,
        from: AssignmentStatus,
        to: AssignmentStatus,
        now: NaiveDateTime,
    ) -> StoreResult<Assignment> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET status = ?, updated_at = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(to.as_ref())
        .bind(now)
        .bind(id)
        .bind(from.as_ref())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let current = self
            .fetch_assignment(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Assignment {} not found", id)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "Assignment {} changed to {} concurrently",
                id, current.status
            )));
        }
        Ok(current)
    }

    async fn open_time_log(
        &self,
        assignment_id: u64,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> StoreResult<TimeLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO time_logs (assignment_id, start_time, note)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(assignment_id)
        .bind(now)
        .bind(note)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(TimeLog {
                id: done.last_insert_id(),
                assignment_id,
                start_time: now,
                end_time: None,
                note: note.map(str::to_string),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
                StoreError::NotFound(format!("Assignment {} not found", assignment_id)),
            ),
            Err(e) => Err(classify(e, || {
                format!("Active TimeLog already exists for assignment {}", assignment_id)
            })),
        }
    }

    async fn close_time_log(&self, log_id: u64, now: NaiveDateTime) -> StoreResult<TimeLog> {
        sqlx::query(
            r#"
            UPDATE time_logs
            SET end_time = ?
            WHERE id = ?
            AND end_time IS NULL
            "#,
        )
        .bind(now)
        .bind(log_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.fetch_time_log(log_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("TimeLog {} not found", log_id)))
    }

    async fn time_logs_for_assignment(&self, assignment_id: u64) -> StoreResult<Vec<TimeLog>> {
        let sql = format!(
            "SELECT {} FROM time_logs WHERE assignment_id = ? ORDER BY id",
            TIME_LOG_COLUMNS
        );
        sqlx::query_as::<_, TimeLog>(&sql)
            .bind(assignment_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn recompute_daily_hours(
        &self,
        employee_id: u64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> StoreResult<DailyWorkHours> {
        let mut attempt = 1;
        loop {
            match self.recompute_once(employee_id, date, now).await {
                Ok(row) => return Ok(row),
                Err(e) if is_retryable(&e) && attempt < LOCK_ATTEMPTS => {
                    warn!(error = %e, employee_id, work_date = %date, attempt, "Daily hours rebuild lost a lock race, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(db_error(e)),
            }
        }
    }

    async fn daily_hours(&self, employee_id: u64) -> StoreResult<Vec<DailyWorkHours>> {
        sqlx::query_as::<_, DailyWorkHours>(
            r#"
            SELECT employee_id, work_date, total_seconds, log_count
            FROM daily_work_hours
            WHERE employee_id = ?
            ORDER BY work_date
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn daily_hours_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyWorkHours>> {
        sqlx::query_as::<_, DailyWorkHours>(
            r#"
            SELECT employee_id, work_date, total_seconds, log_count
            FROM daily_work_hours
            WHERE employee_id = ?
            AND work_date BETWEEN ? AND ?
            ORDER BY work_date
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AssignmentRow {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 55, 0)
            .unwrap();
        AssignmentRow {
            id: 12,
            appointment_id: 4031,
            employee_id: 7,
            status: status.to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn stored_status_text_maps_onto_the_enum() {
        let a = Assignment::try_from(row("IN_PROGRESS")).unwrap();
        assert_eq!(a.status, AssignmentStatus::InProgress);
        assert_eq!((a.id, a.appointment_id, a.employee_id), (12, 4031, 7));
    }

    #[test]
    fn unknown_status_is_a_storage_error() {
        match Assignment::try_from(row("PAUSED")) {
            Err(StoreError::Database(msg)) => assert!(msg.contains("PAUSED")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn taken_appointment_message_names_it() {
        assert_eq!(
            appointment_taken(4031)(),
            "Appointment 4031 already has an active assignment"
        );
    }
}
