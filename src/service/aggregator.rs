//! Daily work-hour totals, always rebuilt from the underlying time logs.
//!
//! A log counts towards the day it started on, even when it runs past
//! midnight. Open logs are measured up to now, so totals for a day with an
//! open log move between calls; closed days are stable.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::work_hours::DailyWorkHours;
use crate::store::WorkStore;

/// Widest range a single repair call may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

pub struct DailyHoursAggregator {
    store: Arc<dyn WorkStore>,
    clock: Arc<dyn Clock>,
}

impl DailyHoursAggregator {
    pub fn new(store: Arc<dyn WorkStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn recompute(&self, employee_id: u64, date: NaiveDate) -> AppResult<DailyWorkHours> {
        let row = self
            .store
            .recompute_daily_hours(employee_id, date, self.clock.now())
            .await?;

        debug!(
            employee_id,
            work_date = %date,
            total_seconds = row.total_seconds,
            log_count = row.log_count,
            "Daily hours recomputed"
        );
        Ok(row)
    }

    /// Days with data, oldest first.
    pub async fn get_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailyWorkHours>> {
        check_order(start, end)?;
        Ok(self.store.daily_hours_range(employee_id, start, end).await?)
    }

    pub async fn get_all(&self, employee_id: u64) -> AppResult<Vec<DailyWorkHours>> {
        Ok(self.store.daily_hours(employee_id).await?)
    }

    /// Rebuilds every day in `start..=end` and returns the days that have data.
    pub async fn recompute_range(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailyWorkHours>> {
        check_order(start, end)?;
        let days = (end - start).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(AppError::Validation(format!(
                "Range covers {} days, at most {} allowed",
                days, MAX_RANGE_DAYS
            )));
        }

        let mut rows = Vec::new();
        for date in start.iter_days().take(days as usize) {
            let row = self.recompute(employee_id, date).await?;
            if row.log_count > 0 {
                rows.push(row);
            }
        }
        info!(employee_id, %start, %end, days_with_data = rows.len(), "Daily hours range recomputed");
        Ok(rows)
    }
}

fn check_order(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::Validation(format!(
            "startDate {} is after endDate {}",
            start, end
        )));
    }
    Ok(())
}
