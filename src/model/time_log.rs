use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    #[schema(example = 301)]
    pub id: u64,
    #[schema(example = 12)]
    pub assignment_id: u64,
    #[schema(value_type = String, format = "date-time", example = "2024-05-01T09:00:00")]
    pub start_time: NaiveDateTime,
    /// `None` while the interval is still open.
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub end_time: Option<NaiveDateTime>,
    #[schema(example = "Replaced brake pads", nullable = true)]
    pub note: Option<String>,
}

impl TimeLog {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Worked seconds; an open log is measured up to `now`.
    pub fn duration_seconds(&self, now: NaiveDateTime) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_seconds().max(0)
    }
}
