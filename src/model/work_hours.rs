use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::time_log::TimeLog;

/// Derived per-employee-per-day total, always rewritten as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyWorkHours {
    pub employee_id: u64,
    pub work_date: NaiveDate,
    pub total_seconds: i64,
    pub log_count: u32,
}

impl DailyWorkHours {
    /// Totals `logs`, all started on `work_date`; open ones run up to `now`.
    pub fn from_logs(employee_id: u64, work_date: NaiveDate, logs: &[TimeLog], now: NaiveDateTime) -> Self {
        Self {
            employee_id,
            work_date,
            total_seconds: logs.iter().map(|l| l.duration_seconds(now)).sum(),
            log_count: logs.len() as u32,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "employeeId": 7,
        "workDate": "2024-05-01",
        "totalSeconds": 6300,
        "logCount": 2,
        "hours": 1.75,
        "formattedHours": "1h 45m"
    })
)]
pub struct WorkHoursResponse {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub total_seconds: i64,
    pub log_count: u32,
    pub hours: f64,
    pub formatted_hours: String,
}

impl From<DailyWorkHours> for WorkHoursResponse {
    fn from(row: DailyWorkHours) -> Self {
        Self {
            employee_id: row.employee_id,
            work_date: row.work_date,
            total_seconds: row.total_seconds,
            log_count: row.log_count,
            hours: row.total_seconds as f64 / 3600.0,
            formatted_hours: format_hours(row.total_seconds),
        }
    }
}

/// "0h", "3h" or "1h 45m".
pub fn format_hours(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "0h".to_string();
    }
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}h", hours)
    }
}
