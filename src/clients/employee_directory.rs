use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{ClientError, ClientResult, EmployeeDirectory, base_url, unwrap_envelope};
use crate::model::employee::Employee;

/// Roster served by the auth service at `GET {base}/employees/all`.
#[derive(Clone)]
pub struct HttpEmployeeDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmployeeDirectory {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base_url: base_url(base),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for HttpEmployeeDirectory {
    async fn list_by_specialization(&self, tag: &str) -> ClientResult<Vec<Employee>> {
        let employees = self
            .list_all()
            .await?
            .into_iter()
            .filter(|e| e.is_assignable() && e.has_specialization(tag))
            .collect::<Vec<_>>();
        debug!(tag, count = employees.len(), "Specialization pool fetched");
        Ok(employees)
    }

    async fn list_all(&self) -> ClientResult<Vec<Employee>> {
        let url = format!("{}/employees/all", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }

        let body = unwrap_envelope(resp.json::<Value>().await?);
        match body {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other).map_err(|e| ClientError::Decode(e.to_string())),
        }
    }
}
