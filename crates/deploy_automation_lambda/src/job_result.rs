//! Write-once reporting of a pipeline job's terminal result.

use deploy_automation_core::contract::{JobResult, PipelineResponse};
use tracing::{error, info};

use crate::adapters::job_reporter::JobReporter;
use crate::error::HandlerError;

/// Reports the result of one pipeline job. Every method consumes the sender,
/// so a job is reported at most once per invocation.
pub struct JobResultSender<'a> {
    reporter: &'a dyn JobReporter,
    job_id: &'a str,
    external_execution_id: &'a str,
}

impl<'a> JobResultSender<'a> {
    pub fn new(
        reporter: &'a dyn JobReporter,
        job_id: &'a str,
        external_execution_id: &'a str,
    ) -> Self {
        Self {
            reporter,
            job_id,
            external_execution_id,
        }
    }

    pub async fn send(self, result: JobResult) -> Result<PipelineResponse, HandlerError> {
        let pipeline_state = result.pipeline_state();
        let reported = match &result {
            JobResult::Succeeded => self.reporter.put_job_success(self.job_id).await,
            JobResult::Failed(failure) => {
                self.reporter.put_job_failure(self.job_id, failure).await
            }
        };

        if let Err(report_error) = reported {
            error!(job_id = self.job_id, error = %report_error, "failed to report job result");
            return Err(HandlerError::Report(report_error));
        }

        info!(job_id = self.job_id, ?pipeline_state, "job result reported");
        Ok(PipelineResponse::new(pipeline_state))
    }

    pub async fn succeed(self) -> Result<PipelineResponse, HandlerError> {
        self.send(JobResult::Succeeded).await
    }

    /// Reports a failure and stops the pipeline without raising.
    pub async fn fail(self, message: impl Into<String>) -> Result<PipelineResponse, HandlerError> {
        let external_execution_id = self.external_execution_id;
        self.send(JobResult::failed(message, external_execution_id))
            .await
    }

    /// Reports a failure, then hands `cause` back to the runtime.
    pub async fn fail_and_raise(
        self,
        cause: HandlerError,
    ) -> Result<PipelineResponse, HandlerError> {
        self.fail(cause.to_string()).await?;
        Err(cause)
    }
}

#[cfg(test)]
mod tests {
    use deploy_automation_core::contract::PipelineState;
    use deploy_automation_core::error::ProviderError;

    use super::*;
    use crate::test_helpers::{FakeJobReporter, ReportedResult};

    #[tokio::test]
    async fn success_keeps_pipeline_running() {
        let reporter = FakeJobReporter::new();
        let response = JobResultSender::new(&reporter, "job-1", "invoke-1")
            .succeed()
            .await
            .expect("report should succeed");

        assert_eq!(response.status, "SUCCESS");
        assert_eq!(response.pipeline_state, PipelineState::Running);
        assert_eq!(
            reporter.reports(),
            vec![ReportedResult::Success {
                job_id: "job-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn failure_stops_pipeline_with_execution_id() {
        let reporter = FakeJobReporter::new();
        let response = JobResultSender::new(&reporter, "job-1", "invoke-1")
            .fail("change set failed")
            .await
            .expect("report should succeed");

        assert_eq!(response.pipeline_state, PipelineState::Stopped);
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        let ReportedResult::Failure { job_id, failure } = &reports[0] else {
            panic!("expected failure report, got {reports:?}");
        };
        assert_eq!(job_id, "job-1");
        assert_eq!(failure.message, "change set failed");
        assert_eq!(failure.external_execution_id, "invoke-1");
    }

    #[tokio::test]
    async fn raised_failure_is_reported_once_and_returned() {
        let reporter = FakeJobReporter::new();
        let error = JobResultSender::new(&reporter, "job-1", "invoke-1")
            .fail_and_raise(HandlerError::Provider(ProviderError::fatal("access denied")))
            .await
            .expect_err("cause should be raised");

        assert!(matches!(error, HandlerError::Provider(_)));
        assert_eq!(reporter.failure_count(), 1);
        assert_eq!(reporter.success_count(), 0);
    }

    #[tokio::test]
    async fn reporter_failure_is_fatal() {
        let reporter = FakeJobReporter::new().failing(ProviderError::transient("throttled"));
        let error = JobResultSender::new(&reporter, "job-1", "invoke-1")
            .succeed()
            .await
            .expect_err("reporter failure should surface");

        assert!(matches!(error, HandlerError::Report(_)));
    }
}
