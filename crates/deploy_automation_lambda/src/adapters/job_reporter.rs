use async_trait::async_trait;
use deploy_automation_core::contract::FailureDetails;
use deploy_automation_core::error::ProviderError;

#[async_trait]
pub trait JobReporter: Send + Sync {
    async fn put_job_success(&self, job_id: &str) -> Result<(), ProviderError>;

    async fn put_job_failure(
        &self,
        job_id: &str,
        failure: &FailureDetails,
    ) -> Result<(), ProviderError>;
}
