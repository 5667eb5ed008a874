use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::appointment::{Appointment, ServiceSummary, VehicleSummary};
use crate::model::assignment::Assignment;

/// Envelope shared by every endpoint: `{ success, data, message }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

/// Posted by the booking flow right after an appointment is saved.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignRequest {
    #[schema(example = 4031)]
    pub appointment_id: u64,
    #[schema(example = "MECHANICAL")]
    #[serde(default)]
    pub service_type: String,
    #[schema(example = "2024-05-01", value_type = Option<String>, format = "date")]
    pub appointment_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AutoAssignQuery {
    /// Appointment to staff
    pub appointment_id: u64,
    /// Job title the employee must hold, e.g. MECHANIC
    pub required_job_title: String,
    /// Day of the appointment
    #[param(value_type = Option<String>, format = "date")]
    pub appointment_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AssignQuery {
    pub employee_id: u64,
    pub appointment_id: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// ASSIGNED, IN_PROGRESS, COMPLETED or CANCELLED
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StartTimeLogQuery {
    pub assignment_id: u64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    #[param(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[param(value_type = String, format = "date")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    #[param(value_type = String, format = "date")]
    pub date: NaiveDate,
}

/// Appointment facts shown next to an assignment on the employee dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub customer_id: Option<u64>,
    pub customer_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub service: Option<ServiceSummary>,
    pub vehicle: Option<VehicleSummary>,
}

impl From<Appointment> for AppointmentSummary {
    fn from(a: Appointment) -> Self {
        Self {
            customer_id: a.customer_id,
            customer_name: a.customer_name,
            appointment_date: a.appointment_date,
            appointment_time: a.appointment_time,
            service: a.service,
            vehicle: a.vehicle,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAssignment {
    #[serde(flatten)]
    #[schema(inline)]
    pub assignment: Assignment,
    /// Absent when the customer service could not be reached.
    pub appointment: Option<AppointmentSummary>,
}

impl EnrichedAssignment {
    pub fn new(assignment: Assignment, appointment: Option<AppointmentSummary>) -> Self {
        Self {
            assignment,
            appointment,
        }
    }
}
