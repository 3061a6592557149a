//! Best-effort alert delivery.
//!
//! Alerts are advisory, not transactional: the dispatcher tries the configured webhook channel
//! once, and on any failure (or when no channel is configured) writes the alert to the local log
//! sink instead. No alert is ever silently lost, but no alert is ever retried either.
mod webhook;

use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use webhook::WebhookSink;

//--------------------------------------      AlertKind      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    LowStock,
    OrderFailed,
    StockReplenished,
}

impl Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::LowStock => write!(f, "LOW_STOCK"),
            AlertKind::OrderFailed => write!(f, "ORDER_FAILED"),
            AlertKind::StockReplenished => write!(f, "STOCK_REPLENISHED"),
        }
    }
}

//--------------------------------------        Alert        ---------------------------------------------------------
/// The payload posted to the notification channel: `{kind, reference_id, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    /// The product or order the alert refers to.
    pub reference_id: String,
    pub message: String,
}

impl Alert {
    pub fn new<R: Display, S: Into<String>>(kind: AlertKind, reference_id: R, message: S) -> Self {
        Self { kind, reference_id: reference_id.to_string(), message: message.into() }
    }
}

impl Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.reference_id, self.message)
    }
}

//--------------------------------------      AlertSink      ---------------------------------------------------------
#[allow(async_fn_in_trait)]
pub trait AlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Could not initialize the notification channel. {0}")]
    Initialization(String),
    #[error("Alert delivery failed. {0}")]
    Delivery(String),
    #[error("The notification channel returned status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
}

//--------------------------------------      LogSink        ---------------------------------------------------------
/// The local fallback sink. Writing to the log cannot fail, which is the whole point.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        warn!("📣️ ALERT {alert}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

//--------------------------------------  NotificationDispatcher  ----------------------------------------------------
/// Routes alerts to the configured channel, falling back to the log sink.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    webhook: Option<WebhookSink>,
    fallback: LogSink,
}

impl NotificationDispatcher {
    pub fn new(webhook: Option<WebhookSink>) -> Self {
        match &webhook {
            Some(_) => info!("📣️ Notifications: webhook channel active"),
            None => info!("📣️ Notifications: no webhook configured, alerts go to the log"),
        }
        Self { webhook, fallback: LogSink }
    }

    /// Delivers the alert. Infallible by construction: the fallback sink absorbs every failure.
    pub async fn dispatch(&self, alert: Alert) {
        if let Some(webhook) = &self.webhook {
            match webhook.deliver(&alert).await {
                Ok(()) => {
                    debug!("📣️ Alert delivered via {}: {alert}", webhook.name());
                    return;
                },
                Err(e) => {
                    warn!("📣️ Webhook delivery failed ({e}); falling back to the {} sink", self.fallback.name());
                },
            }
        }
        // Cannot fail.
        let _ = self.fallback.deliver(&alert).await;
    }
}
