use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::MailConfig;

/// Best-effort email boundary. Callers on the registration and OAuth paths
/// never observe failures; the forgot-password flow awaits the result.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP mail API.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(mail: &MailConfig, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: mail.api_key.clone(),
            sender: mail.sender.clone(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.sender,
            "to": to,
            "subject": subject,
            "text": body,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("mail API returned {}", response.status());
        }
        debug!(to, subject, "email dispatched");
        Ok(())
    }
}

/// Used when no mail endpoint is configured and in tests.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        debug!(to, subject, "mail endpoint not configured, dropping email");
        Ok(())
    }
}

/// Fire-and-forget dispatch: runs detached with a bounded timeout and only
/// ever logs failures. The caller's success path cannot observe the outcome.
pub fn send_detached(
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    to: String,
    subject: String,
    body: String,
) {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.send(&to, &subject, &body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, to, "background email failed"),
            Err(_) => warn!(to, "background email timed out"),
        }
    });
}
