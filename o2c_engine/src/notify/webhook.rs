use std::time::Duration;

use o2c_common::Secret;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use super::{Alert, AlertSink, NotifyError};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts alerts as JSON to a configured webhook URL (Slack-style incoming webhook, or anything
/// else that accepts a POST). The URL frequently embeds a token, so it is held as a [`Secret`] and
/// never logged.
#[derive(Clone)]
pub struct WebhookSink {
    url: Secret<String>,
    client: Client,
}

impl WebhookSink {
    pub fn new(url: Secret<String>) -> Result<Self, NotifyError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Initialization(e.to_string()))?;
        Ok(Self { url, client })
    }
}

impl AlertSink for WebhookSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.reveal())
            .json(alert)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| NotifyError::Delivery(e.to_string()))?;
            Err(NotifyError::UnexpectedStatus { status, message })
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
