//! Prepares the source and parameter artifacts consumed by a stage deployment.
//!
//! The source is the last recorded artifact when a marker exists, otherwise the
//! job's own input. Parameters come from the recorded snapshot or, on a first
//! run, from the `StageParameters` parameter of the deployed stack. Every
//! failure stops the pipeline through a failure report instead of raising.

use deploy_automation_core::config::StageArtifactCreatorConfig;
use deploy_automation_core::contract::{
    CodePipelineJob, ParameterSnapshot, PipelineResponse, S3Location, StageConfiguration,
    STAGE_CONFIGURATION_FILE_NAME, STAGE_PARAMETERS_KEY,
};
use deploy_automation_core::error::{EventError, ProviderError};
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::object_store::{ArtifactStore, ServerSideEncryption};
use crate::adapters::parameter_store::ParameterStore;
use crate::adapters::resource_state::ResourceStateProvider;
use crate::archive::{single_entry_archive, ArchiveError};
use crate::deadline::{race_deadline, Invocation};
use crate::error::HandlerError;
use crate::job_result::JobResultSender;
use crate::marker_store::{MarkerStore, MarkerStoreError};

#[derive(Debug, Error)]
pub enum StageArtifactError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    MarkerStore(#[from] MarkerStoreError),
    #[error("failed to read parameters of stack {stack_name}: {source}")]
    StackParameters {
        stack_name: String,
        #[source]
        source: ProviderError,
    },
    #[error("stack {stack_name} has no StageParameters parameter")]
    MissingStageParameters { stack_name: String },
    #[error("StageParameters of stack {stack_name} is not valid JSON: {source}")]
    MalformedStageParameters {
        stack_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to copy {copy_source} to {bucket}/{key}: {source}")]
    Copy {
        copy_source: String,
        bucket: String,
        key: String,
        #[source]
        source: ProviderError,
    },
    #[error("failed to serialize stage configuration: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("failed to upload parameter artifact to {bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: ProviderError,
    },
}

pub struct StageArtifactCreatorDeps<'a> {
    pub provider: &'a dyn ResourceStateProvider,
    pub parameters: &'a dyn ParameterStore,
    pub artifacts: &'a dyn ArtifactStore,
    pub reporter: &'a dyn JobReporter,
}

pub async fn handle_stage_artifact_creation(
    job: &CodePipelineJob,
    invocation: &Invocation,
    config: &StageArtifactCreatorConfig,
    deps: &StageArtifactCreatorDeps<'_>,
) -> Result<PipelineResponse, HandlerError> {
    let sender = JobResultSender::new(deps.reporter, &job.id, &invocation.request_id);

    match race_deadline(invocation.budget, create_stage_artifacts(job, config, deps)).await {
        Ok(Ok(())) => sender.succeed().await,
        Ok(Err(cause)) => {
            error!(job_id = %job.id, error = %cause, "stage artifact creation failed");
            sender.fail(cause.to_string()).await
        }
        Err(timeout) => sender.fail_and_raise(timeout.into()).await,
    }
}

pub async fn create_stage_artifacts(
    job: &CodePipelineJob,
    config: &StageArtifactCreatorConfig,
    deps: &StageArtifactCreatorDeps<'_>,
) -> Result<(), StageArtifactError> {
    let source_output = &job
        .output_artifact(&config.artifact_source_name)?
        .location
        .s3_location;
    let parameter_output = &job
        .output_artifact(&config.artifact_parameter_name)?
        .location
        .s3_location;

    let store = MarkerStore::new(
        deps.parameters,
        &config.artifact_source_parameter,
        &config.artifact_parameter_parameter,
    );
    let source = resolve_source(job, &store).await?;
    let parameters = match store.read_snapshot().await? {
        Some(snapshot) => snapshot,
        None => deployed_stage_parameters(deps.provider, &config.stack_name).await?,
    };

    let copy_source = source.copy_source();
    deps.artifacts
        .copy_object(
            &source_output.bucket_name,
            &source_output.object_key,
            &copy_source,
        )
        .await
        .map_err(|source| StageArtifactError::Copy {
            copy_source: copy_source.clone(),
            bucket: source_output.bucket_name.clone(),
            key: source_output.object_key.clone(),
            source,
        })?;

    let configuration = serde_json::to_vec(&StageConfiguration { parameters })
        .map_err(StageArtifactError::Serialize)?;
    let archive = single_entry_archive(STAGE_CONFIGURATION_FILE_NAME, &configuration)?;
    deps.artifacts
        .put_object(
            &parameter_output.bucket_name,
            &parameter_output.object_key,
            archive,
            ServerSideEncryption::BucketDefault,
        )
        .await
        .map_err(|source| StageArtifactError::Upload {
            bucket: parameter_output.bucket_name.clone(),
            key: parameter_output.object_key.clone(),
            source,
        })?;

    info!(
        job_id = %job.id,
        %copy_source,
        parameter_artifact = %parameter_output.copy_source(),
        "stage artifacts created"
    );
    Ok(())
}

async fn resolve_source(
    job: &CodePipelineJob,
    store: &MarkerStore<'_>,
) -> Result<S3Location, StageArtifactError> {
    if let Some(marker) = store.read_marker().await? {
        return Ok(marker.location());
    }

    info!(job_id = %job.id, "no recorded artifact, staging the job input");
    Ok(job.first_input_artifact()?.location.s3_location.clone())
}

async fn deployed_stage_parameters(
    provider: &dyn ResourceStateProvider,
    stack_name: &str,
) -> Result<ParameterSnapshot, StageArtifactError> {
    let parameters = provider
        .describe_stack_parameters(stack_name)
        .await
        .map_err(|source| StageArtifactError::StackParameters {
            stack_name: stack_name.to_string(),
            source,
        })?;

    let raw = parameters
        .iter()
        .find(|parameter| parameter.parameter_key == STAGE_PARAMETERS_KEY)
        .map(|parameter| parameter.parameter_value.as_str())
        .ok_or_else(|| StageArtifactError::MissingStageParameters {
            stack_name: stack_name.to_string(),
        })?;

    ParameterSnapshot::from_stage_parameter_value(raw).map_err(|source| {
        StageArtifactError::MalformedStageParameters {
            stack_name: stack_name.to_string(),
            source,
        }
    })
}
