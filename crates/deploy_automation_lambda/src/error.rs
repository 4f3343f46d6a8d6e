use deploy_automation_core::config::ConfigError;
use deploy_automation_core::error::{EventError, ProviderError};
use thiserror::Error;

use crate::deadline::DeadlineExceeded;
use crate::handlers::drift_detection::DriftError;
use crate::marker_store::MarkerStoreError;

/// Errors a handler raises back to the Lambda runtime.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    MarkerStore(#[from] MarkerStoreError),
    #[error(transparent)]
    Drift(#[from] DriftError),
    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
    #[error("failed to report job result: {0}")]
    Report(#[source] ProviderError),
}
