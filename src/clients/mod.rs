//! Outbound collaborators: the employee roster, the appointment owner and the
//! notification service. All are plain network calls with no local cache;
//! each call is a fresh snapshot.

pub mod appointment_directory;
pub mod employee_directory;
pub mod notification;

use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use serde_json::Value;

use crate::model::appointment::{Appointment, Customer};
use crate::model::employee::Employee;

#[derive(Debug, Display)]
pub enum ClientError {
    #[display(fmt = "upstream request failed: {}", _0)]
    Http(String),
    #[display(fmt = "upstream returned {} for {}", status, url)]
    Status { status: u16, url: String },
    #[display(fmt = "unexpected upstream payload: {}", _0)]
    Decode(String),
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Active employees whose job title matches `tag`, in directory order.
    async fn list_by_specialization(&self, tag: &str) -> ClientResult<Vec<Employee>>;

    /// The full roster, in directory order.
    async fn list_all(&self) -> ClientResult<Vec<Employee>>;

    async fn find_employee(&self, id: u64) -> ClientResult<Option<Employee>> {
        Ok(self.list_all().await?.into_iter().find(|e| e.id == id))
    }
}

#[async_trait]
pub trait AppointmentDirectory: Send + Sync {
    async fn get_appointment(&self, id: u64) -> ClientResult<Option<Appointment>>;

    async fn get_customer(&self, id: u64) -> ClientResult<Option<Customer>>;

    /// Status hint for the appointment owner; callers treat it as best effort.
    async fn set_status(&self, id: u64, status: &str) -> ClientResult<()>;
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> ClientResult<()>;

    async fn send_sms(&self, to: &str, message: &str) -> ClientResult<()>;
}

/// One pooled HTTP client shared by every collaborator, with a hard timeout.
pub fn http_client(timeout: Duration) -> ClientResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("workforce/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Peels the `{ "success": .., "data": {..} }` wrapper some services add.
pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(|d| d.is_object() || d.is_array()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_data_envelope_only_when_present() {
        let wrapped = json!({"success": true, "data": {"id": 3}, "message": "ok"});
        assert_eq!(unwrap_envelope(wrapped), json!({"id": 3}));

        let bare = json!({"id": 3, "data": "not an object"});
        assert_eq!(unwrap_envelope(bare.clone()), bare);
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(base_url("http://auth:8081/api/"), "http://auth:8081/api");
    }
}
