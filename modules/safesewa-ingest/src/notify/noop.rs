use async_trait::async_trait;
use tracing::debug;

use super::backend::NotifyBackend;

/// Backend used when no gateway is configured, and in tests.
pub struct NoopNotify;

#[async_trait]
impl NotifyBackend for NoopNotify {
    async fn notify(&self, title: &str, _body: &str, topic: &str) -> anyhow::Result<()> {
        debug!(title, topic, "Push gateway not configured, dropping notification");
        Ok(())
    }
}
