use async_trait::async_trait;

/// Pluggable push-notification backend.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Deliver a notification to everyone subscribed to `topic`
    /// (e.g. `flood-alerts`).
    async fn notify(&self, title: &str, body: &str, topic: &str) -> anyhow::Result<()>;
}
