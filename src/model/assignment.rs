use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Statuses that count towards an employee's workload.
    pub fn is_active(self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::InProgress)
    }

    /// ASSIGNED -> IN_PROGRESS -> COMPLETED, and any active status -> CANCELLED.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, InProgress) | (InProgress, Completed) | (Assigned, Cancelled) | (InProgress, Cancelled)
        )
    }

    /// Status pushed to the appointment owner when an assignment moves.
    pub fn appointment_status_hint(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "CONFIRMED",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 12,
        "appointmentId": 4031,
        "employeeId": 7,
        "status": "ASSIGNED",
        "createdAt": "2024-05-01T08:55:00",
        "updatedAt": "2024-05-01T08:55:00"
    })
)]
pub struct Assignment {
    pub id: u64,
    pub appointment_id: u64,
    pub employee_id: u64,
    pub status: AssignmentStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Maps a booked service category onto the job title that can work it.
pub fn required_specialization(service_category: &str) -> &'static str {
    match service_category.trim().to_ascii_uppercase().as_str() {
        "MECHANICAL" => "MECHANIC",
        "ELECTRICAL" => "TECHNICIAN",
        _ => "GENERAL EMPLOYEE",
    }
}
