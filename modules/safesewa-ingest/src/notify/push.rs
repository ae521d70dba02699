use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::backend::NotifyBackend;

/// Webhook-style push gateway (FCM-compatible topic messaging).
pub struct PushGateway {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl PushGateway {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyBackend for PushGateway {
    async fn notify(&self, title: &str, body: &str, topic: &str) -> anyhow::Result<()> {
        let payload = json!({
            "notification": { "title": title, "body": body },
            "topic": topic,
        });

        let mut req = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Push gateway returned non-success");
            anyhow::bail!("push gateway returned {status}");
        }

        Ok(())
    }
}
