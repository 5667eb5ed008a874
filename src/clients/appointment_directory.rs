use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::{AppointmentDirectory, ClientError, ClientResult, base_url, unwrap_envelope};
use crate::model::appointment::{Appointment, Customer};

/// Customer service client. Reads prefer the public endpoints and fall back
/// to the legacy ones.
#[derive(Clone)]
pub struct HttpAppointmentDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAppointmentDirectory {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base_url: base_url(base),
        }
    }

    /// `Ok(None)` on 404.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        let body = unwrap_envelope(resp.json::<Value>().await?);
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AppointmentDirectory for HttpAppointmentDirectory {
    async fn get_appointment(&self, id: u64) -> ClientResult<Option<Appointment>> {
        match self.fetch(&format!("/public/appointments/{}", id)).await {
            Ok(Some(appt)) => return Ok(Some(appt)),
            Ok(None) => debug!(appointment_id = id, "Public appointment endpoint has no record, trying legacy"),
            Err(e) => debug!(appointment_id = id, error = %e, "Public appointment endpoint failed, trying legacy"),
        }
        self.fetch(&format!("/appointments/{}", id)).await
    }

    async fn get_customer(&self, id: u64) -> ClientResult<Option<Customer>> {
        match self.fetch(&format!("/public/customers/{}", id)).await {
            Ok(Some(customer)) => return Ok(Some(customer)),
            Ok(None) => debug!(customer_id = id, "Public customer endpoint has no record, trying legacy"),
            Err(e) => debug!(customer_id = id, error = %e, "Public customer endpoint failed, trying legacy"),
        }
        self.fetch(&format!("/customers/{}", id)).await
    }

    async fn set_status(&self, id: u64, status: &str) -> ClientResult<()> {
        let url = format!("{}/appointments/{}/status", self.base_url, id);
        let resp = self
            .client
            .put(&url)
            .query(&[("status", status)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        info!(appointment_id = id, status, "Appointment status synced");
        Ok(())
    }
}
