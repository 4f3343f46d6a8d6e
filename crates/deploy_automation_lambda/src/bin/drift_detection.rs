use deploy_automation_lambda::adapters::aws::{
    load_default_sdk_config, load_sdk_config, CloudFormationProvider, CodePipelineReporter,
    SnsNotifier,
};
use deploy_automation_lambda::deadline::Invocation;
use deploy_automation_lambda::handlers::drift_detection::{
    handle_drift_detection, DriftDetectionDeps,
};
use deploy_automation_lambda::job_result::JobResultSender;
use deploy_automation_lambda::runtime::config::DriftDetectionConfig;
use deploy_automation_lambda::runtime::contract::{CodePipelineEvent, PipelineResponse};
use deploy_automation_lambda::telemetry::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};

async fn handle_request(event: LambdaEvent<CodePipelineEvent>) -> Result<PipelineResponse, Error> {
    let (payload, context) = event.into_parts();
    let invocation = Invocation::from_context(&context);
    let job = payload.job;
    let reporter = CodePipelineReporter::new(&load_default_sdk_config().await);

    let config = match DriftDetectionConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            let sender = JobResultSender::new(&reporter, &job.id, &invocation.request_id);
            return Ok(sender.fail_and_raise(error.into()).await?);
        }
    };

    let primary_config = load_sdk_config(&config.primary.region).await;
    let secondary_config = load_sdk_config(&config.secondary.region).await;
    let primary = CloudFormationProvider::new(&primary_config);
    let secondary = CloudFormationProvider::new(&secondary_config);
    let notifier = SnsNotifier::new(&primary_config, config.notification_topic_arn.clone());

    let deps = DriftDetectionDeps {
        primary: &primary,
        secondary: &secondary,
        notifier: &notifier,
        reporter: &reporter,
    };
    Ok(handle_drift_detection(&job, &invocation, &config, &deps).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging()?;
    lambda_runtime::run(service_fn(handle_request)).await
}
