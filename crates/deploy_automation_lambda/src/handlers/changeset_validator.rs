//! Stops the pipeline when the change set prepared for a stack has failed.

use deploy_automation_core::config::ChangeSetValidatorConfig;
use deploy_automation_core::contract::{CodePipelineJob, PipelineResponse};
use tracing::{info, warn};

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::resource_state::ResourceStateProvider;
use crate::deadline::{race_deadline, Invocation};
use crate::error::HandlerError;
use crate::job_result::JobResultSender;

pub struct ChangeSetValidatorDeps<'a> {
    pub provider: &'a dyn ResourceStateProvider,
    pub reporter: &'a dyn JobReporter,
}

/// The change set is named after the job's first input artifact.
pub async fn handle_change_set_validation(
    job: &CodePipelineJob,
    invocation: &Invocation,
    config: &ChangeSetValidatorConfig,
    deps: &ChangeSetValidatorDeps<'_>,
) -> Result<PipelineResponse, HandlerError> {
    let sender = JobResultSender::new(deps.reporter, &job.id, &invocation.request_id);
    let change_set_name = match job.first_input_artifact() {
        Ok(artifact) => artifact.name.as_str(),
        Err(error) => return sender.fail_and_raise(error.into()).await,
    };

    let describe = deps
        .provider
        .describe_change_set(&config.stack_name, change_set_name);
    let state = match race_deadline(invocation.budget, describe).await {
        Ok(Ok(state)) => state,
        Ok(Err(error)) => return sender.fail_and_raise(error.into()).await,
        Err(timeout) => return sender.fail_and_raise(timeout.into()).await,
    };

    if state.has_failed() {
        let message = state.failure_message();
        warn!(
            stack_name = %config.stack_name,
            change_set_name,
            reason = %message,
            "change set failed"
        );
        return sender.fail(message).await;
    }

    info!(
        stack_name = %config.stack_name,
        change_set_name,
        status = ?state.status,
        "change set is usable"
    );
    sender.succeed().await
}
