//! Stage rollback driven by approval state-change events.
//!
//! When the expected approval action changes state, the stage stack is either
//! deleted or rolled forward to the last artifact that deployed successfully.
//! Every failure collapses into the generic error envelope; the cause is only
//! logged.

use deploy_automation_core::approval_gate::GateDecision;
use deploy_automation_core::config::RollbackConfig;
use deploy_automation_core::contract::{ApprovalStateChangeEvent, ArtifactMarker, RollbackResponse};
use deploy_automation_core::error::ProviderError;
use deploy_automation_core::rollback::{
    template_url, DeleteReason, RollbackOutcome, DIFFERENT_APPROVAL_MESSAGE,
    ROLLBACK_ERROR_MESSAGE, STAGE_STACK_CAPABILITIES,
};
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::object_store::{ArtifactStore, ServerSideEncryption};
use crate::adapters::parameter_store::ParameterStore;
use crate::adapters::resource_state::{ResourceStateProvider, StackUpdateRequest};
use crate::archive::{extract_entry, ArchiveError};
use crate::deadline::{race_deadline, Invocation};
use crate::marker_store::{MarkerStore, MarkerStoreError};

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("failed to delete stack {stack_name}: {source}")]
    Delete {
        stack_name: String,
        #[source]
        source: ProviderError,
    },
    #[error(transparent)]
    MarkerStore(#[from] MarkerStoreError),
    #[error("failed to fetch source bundle {bucket}/{key}: {source}")]
    ArtifactFetch {
        bucket: String,
        key: String,
        #[source]
        source: ProviderError,
    },
    #[error("failed to extract template: {0}")]
    TemplateExtract(#[from] ArchiveError),
    #[error("failed to upload template to {bucket}/{key}: {source}")]
    TemplateUpload {
        bucket: String,
        key: String,
        #[source]
        source: ProviderError,
    },
    #[error("failed to update stack {stack_name}: {source}")]
    Update {
        stack_name: String,
        #[source]
        source: ProviderError,
    },
}

pub struct RollbackDeps<'a> {
    pub provider: &'a dyn ResourceStateProvider,
    pub parameters: &'a dyn ParameterStore,
    pub artifacts: &'a dyn ArtifactStore,
}

pub async fn handle_rollback_event(
    event: &ApprovalStateChangeEvent,
    invocation: &Invocation,
    config: &RollbackConfig,
    deps: &RollbackDeps<'_>,
) -> RollbackResponse {
    if config.approval.evaluate(&event.detail) == GateDecision::NoMatch {
        info!(
            pipeline = %event.detail.pipeline,
            stage = %event.detail.stage,
            action = %event.detail.action,
            "approval event is for a different action"
        );
        return RollbackResponse::success(DIFFERENT_APPROVAL_MESSAGE);
    }

    match race_deadline(invocation.budget, reconcile_stage(config, deps)).await {
        Ok(Ok(outcome)) => {
            info!(stack_name = %config.stage_stack_name, ?outcome, "stage rollback triggered");
            outcome.into_response()
        }
        Ok(Err(cause)) => {
            error!(stack_name = %config.stage_stack_name, error = %cause, "stage rollback failed");
            RollbackResponse::error(ROLLBACK_ERROR_MESSAGE)
        }
        Err(timeout) => {
            error!(stack_name = %config.stage_stack_name, "stage rollback timed out");
            RollbackResponse::error(timeout.to_string())
        }
    }
}

/// Deletes the stage stack or rolls it forward to the recorded artifact.
///
/// Nothing is mutated until the marker lookup has settled, so a marker read
/// error leaves the stage untouched.
pub async fn reconcile_stage(
    config: &RollbackConfig,
    deps: &RollbackDeps<'_>,
) -> Result<RollbackOutcome, RollbackError> {
    if config.force_delete {
        delete_stage(config, deps).await?;
        return Ok(RollbackOutcome::DeleteTriggered(DeleteReason::Forced));
    }

    let store = MarkerStore::new(
        deps.parameters,
        &config.artifact_source_parameter,
        &config.artifact_parameter_parameter,
    );
    let Some(marker) = store.read_marker().await? else {
        delete_stage(config, deps).await?;
        return Ok(RollbackOutcome::DeleteTriggered(
            DeleteReason::NoPriorDeployment,
        ));
    };

    roll_forward(config, deps, &store, &marker).await
}

async fn delete_stage(
    config: &RollbackConfig,
    deps: &RollbackDeps<'_>,
) -> Result<(), RollbackError> {
    deps.provider
        .delete_stack(&config.stage_stack_name)
        .await
        .map_err(|source| RollbackError::Delete {
            stack_name: config.stage_stack_name.clone(),
            source,
        })
}

async fn roll_forward(
    config: &RollbackConfig,
    deps: &RollbackDeps<'_>,
    store: &MarkerStore<'_>,
    marker: &ArtifactMarker,
) -> Result<RollbackOutcome, RollbackError> {
    let bundle = deps
        .artifacts
        .get_object(&marker.source_bucket, &marker.source_key)
        .await
        .map_err(|source| RollbackError::ArtifactFetch {
            bucket: marker.source_bucket.clone(),
            key: marker.source_key.clone(),
            source,
        })?;
    let template = extract_entry(&bundle, &config.template_path)?;

    deps.artifacts
        .put_object(
            &marker.source_bucket,
            &config.template_path,
            template,
            ServerSideEncryption::Aes256,
        )
        .await
        .map_err(|source| RollbackError::TemplateUpload {
            bucket: marker.source_bucket.clone(),
            key: config.template_path.clone(),
            source,
        })?;

    let snapshot = store.read_snapshot().await?.unwrap_or_default();
    let request = StackUpdateRequest {
        stack_name: config.stage_stack_name.clone(),
        template_url: template_url(&marker.source_bucket, &config.region, &config.template_path),
        parameters: snapshot.to_stack_parameters(),
        capabilities: STAGE_STACK_CAPABILITIES
            .iter()
            .map(|capability| capability.to_string())
            .collect(),
    };

    let stack_id = deps
        .provider
        .update_stack(&request)
        .await
        .map_err(|source| RollbackError::Update {
            stack_name: config.stage_stack_name.clone(),
            source,
        })?;
    Ok(RollbackOutcome::UpdateTriggered { stack_id })
}
