use deploy_automation_lambda::adapters::aws::{
    load_default_sdk_config, load_sdk_config, CloudFormationProvider, CodePipelineReporter,
    S3ArtifactStore, SsmParameterStore,
};
use deploy_automation_lambda::deadline::Invocation;
use deploy_automation_lambda::handlers::stage_artifact_creator::{
    handle_stage_artifact_creation, StageArtifactCreatorDeps,
};
use deploy_automation_lambda::job_result::JobResultSender;
use deploy_automation_lambda::runtime::config::StageArtifactCreatorConfig;
use deploy_automation_lambda::runtime::contract::{CodePipelineEvent, PipelineResponse};
use deploy_automation_lambda::telemetry::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};

async fn handle_request(event: LambdaEvent<CodePipelineEvent>) -> Result<PipelineResponse, Error> {
    let (payload, context) = event.into_parts();
    let invocation = Invocation::from_context(&context);
    let job = payload.job;
    let reporter = CodePipelineReporter::new(&load_default_sdk_config().await);

    let config = match StageArtifactCreatorConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            let sender = JobResultSender::new(&reporter, &job.id, &invocation.request_id);
            return Ok(sender.fail_and_raise(error.into()).await?);
        }
    };

    let sdk_config = load_sdk_config(&config.region).await;
    let provider = CloudFormationProvider::new(&sdk_config);
    let parameters = SsmParameterStore::new(&sdk_config);
    let artifacts = S3ArtifactStore::new(&sdk_config);
    let deps = StageArtifactCreatorDeps {
        provider: &provider,
        parameters: &parameters,
        artifacts: &artifacts,
        reporter: &reporter,
    };
    Ok(handle_stage_artifact_creation(&job, &invocation, &config, &deps).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging()?;
    lambda_runtime::run(service_fn(handle_request)).await
}
