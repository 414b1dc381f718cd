use async_trait::async_trait;
use eyre::Result;
use tracing::info;

/// Delivers status lines to whoever started an execution.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, session_id: &str, text: &str) -> Result<()>;
}

/// Writes status lines to the log, tagged with the session.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, session_id: &str, text: &str) -> Result<()> {
        info!(session_id, "{}", text);
        Ok(())
    }
}
