use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{Notification, Notifier};

/// Delivers notifications as a JSON POST to a single endpoint.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("building webhook http client")?;

        Ok(Self { http, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, notification), fields(subject = %notification.subject), level = "debug")]
    async fn publish(&self, topic: &str, notification: &Notification) -> anyhow::Result<()> {
        let body = WebhookBody {
            topic,
            subject: &notification.subject,
            message: &notification.body,
        };

        self.http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected notification")?;

        debug!("notification delivered");
        Ok(())
    }
}
