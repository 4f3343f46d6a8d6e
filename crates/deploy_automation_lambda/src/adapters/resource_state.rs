use async_trait::async_trait;
use deploy_automation_core::change_set::ChangeSetState;
use deploy_automation_core::contract::StackParameter;
use deploy_automation_core::drift::{DriftDetectionHandle, DriftStatus};
use deploy_automation_core::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackUpdateRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub capabilities: Vec<String>,
}

/// Remote infrastructure state, scoped to a single region.
#[async_trait]
pub trait ResourceStateProvider: Send + Sync {
    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetState, ProviderError>;

    /// Starts drift detection. A stack that does not exist yet is
    /// `ProviderError::NotFound`.
    async fn detect_drift(&self, stack_name: &str) -> Result<DriftDetectionHandle, ProviderError>;

    async fn describe_drift_detection_status(
        &self,
        handle: &DriftDetectionHandle,
    ) -> Result<DriftStatus, ProviderError>;

    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError>;

    /// Returns the identifier of the stack being updated.
    async fn update_stack(&self, request: &StackUpdateRequest) -> Result<String, ProviderError>;

    async fn describe_stack_parameters(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackParameter>, ProviderError>;
}
