use deploy_automation_lambda::adapters::aws::{
    load_sdk_config, CloudFormationProvider, S3ArtifactStore, SsmParameterStore,
};
use deploy_automation_lambda::deadline::Invocation;
use deploy_automation_lambda::handlers::rollback_change::{handle_rollback_event, RollbackDeps};
use deploy_automation_lambda::runtime::config::RollbackConfig;
use deploy_automation_lambda::runtime::contract::{ApprovalStateChangeEvent, RollbackResponse};
use deploy_automation_lambda::telemetry::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};

async fn handle_request(
    event: LambdaEvent<ApprovalStateChangeEvent>,
) -> Result<RollbackResponse, Error> {
    let (payload, context) = event.into_parts();
    let invocation = Invocation::from_context(&context);
    let config = RollbackConfig::from_env()?;

    let sdk_config = load_sdk_config(&config.region).await;
    let provider = CloudFormationProvider::new(&sdk_config);
    let parameters = SsmParameterStore::new(&sdk_config);
    let artifacts = S3ArtifactStore::new(&sdk_config);
    let deps = RollbackDeps {
        provider: &provider,
        parameters: &parameters,
        artifacts: &artifacts,
    };

    Ok(handle_rollback_event(&payload, &invocation, &config, &deps).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging()?;
    lambda_runtime::run(service_fn(handle_request)).await
}
