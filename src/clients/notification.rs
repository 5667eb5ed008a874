use async_trait::async_trait;
use serde::Serialize;

use super::{ClientError, ClientResult, NotificationDispatcher, base_url};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailRequest<'a> {
    to_mail: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsRequest<'a> {
    to_number: &'a str,
    message: &'a str,
}

/// Notification service; it queues and delivers, we only hand messages over.
#[derive(Clone)]
pub struct HttpNotificationDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationDispatcher {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base_url: base_url(base),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, payload: &T) -> ClientResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).json(payload).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> ClientResult<()> {
        self.post(
            "/api/email/send",
            &EmailRequest {
                to_mail: to,
                subject,
                body,
            },
        )
        .await
    }

    async fn send_sms(&self, to: &str, message: &str) -> ClientResult<()> {
        self.post(
            "/api/sms/send",
            &SmsRequest {
                to_number: to,
                message,
            },
        )
        .await
    }
}
