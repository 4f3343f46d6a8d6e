use thiserror::Error;

/// Failure of a call against an external service.
///
/// `NotFound` is distinguished because handlers use it to detect a first run
/// (missing marker, stack not created yet) rather than a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    NotFound(String),
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("{0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("pipeline job has no input artifacts")]
    MissingInputArtifact,
    #[error("pipeline job has no output artifact named '{0}'")]
    MissingOutputArtifact(String),
}
