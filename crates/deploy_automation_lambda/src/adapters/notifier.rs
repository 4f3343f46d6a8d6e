use async_trait::async_trait;
use thiserror::Error;

/// Errors from the notification channel. Callers log these and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError>;
}
