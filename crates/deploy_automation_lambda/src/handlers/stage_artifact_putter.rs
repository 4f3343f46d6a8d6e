//! Records the artifact that just deployed so a later rollback can return to it.

use deploy_automation_core::config::StageArtifactPutterConfig;
use deploy_automation_core::contract::{ArtifactMarker, CodePipelineJob, PipelineResponse};

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::parameter_store::ParameterStore;
use crate::deadline::{race_deadline, Invocation};
use crate::error::HandlerError;
use crate::job_result::JobResultSender;
use crate::marker_store::MarkerStore;

pub struct StageArtifactPutterDeps<'a> {
    pub parameters: &'a dyn ParameterStore,
    pub reporter: &'a dyn JobReporter,
}

pub async fn handle_stage_artifact_put(
    job: &CodePipelineJob,
    invocation: &Invocation,
    config: &StageArtifactPutterConfig,
    deps: &StageArtifactPutterDeps<'_>,
) -> Result<PipelineResponse, HandlerError> {
    let sender = JobResultSender::new(deps.reporter, &job.id, &invocation.request_id);
    let marker = match job.first_input_artifact() {
        Ok(artifact) => ArtifactMarker::from_location(&artifact.location.s3_location),
        Err(error) => return sender.fail_and_raise(error.into()).await,
    };

    let store = MarkerStore::new(
        deps.parameters,
        &config.artifact_source_parameter,
        &config.artifact_parameter_parameter,
    );
    match race_deadline(invocation.budget, store.write(&marker, &config.stack_parameters)).await {
        Ok(Ok(())) => sender.succeed().await,
        Ok(Err(error)) => sender.fail_and_raise(error.into()).await,
        Err(timeout) => sender.fail_and_raise(timeout.into()).await,
    }
}
