//! Notification transport.
//!
//! Every analysis cycle ends in exactly one notification: heartbeat, signal alert,
//! routine status or error. The transport only has to deliver subject + body
//! to a topic.

pub mod messages;
pub mod webhook;

use async_trait::async_trait;
use tracing::info;

pub use webhook::WebhookNotifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, topic: &str, notification: &Notification) -> anyhow::Result<()> {
        info!(
            target: "notify",
            topic = %topic,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}
