//! AWS SDK implementations of the collaborator traits.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::types::{Capability, Parameter};
use aws_sdk_codepipeline::types::{FailureDetails as PipelineFailureDetails, FailureType};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssm::types::ParameterType;
use deploy_automation_core::change_set::{ChangeSetState, ChangeSetStatus};
use deploy_automation_core::contract::{FailureDetails, StackParameter};
use deploy_automation_core::drift::{
    DetectionState, DriftDetectionHandle, DriftResult, DriftStatus,
};
use deploy_automation_core::error::ProviderError;

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::notifier::{NotifyError, Notifier};
use crate::adapters::object_store::{ArtifactStore, ServerSideEncryption};
use crate::adapters::parameter_store::ParameterStore;
use crate::adapters::resource_state::{ResourceStateProvider, StackUpdateRequest};

const MAX_FAILURE_MESSAGE_CHARS: usize = 5_000;

const TRANSIENT_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "InternalFailure",
    "ServiceUnavailable",
    "SlowDown",
];

pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// SDK configuration for the function's own region.
pub async fn load_default_sdk_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

fn classify_sdk_error<E, R>(
    error: SdkError<E, R>,
    is_not_found: fn(Option<&str>, Option<&str>) -> bool,
) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&error).to_string());

    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::transient(detail)
        }
        _ if is_not_found(error.code(), error.message()) => ProviderError::not_found(detail),
        _ if error
            .code()
            .is_some_and(|code| TRANSIENT_ERROR_CODES.contains(&code)) =>
        {
            ProviderError::transient(detail)
        }
        _ => ProviderError::fatal(detail),
    }
}

fn never_not_found(_code: Option<&str>, _message: Option<&str>) -> bool {
    false
}

fn parameter_not_found(code: Option<&str>, _message: Option<&str>) -> bool {
    code == Some("ParameterNotFound")
}

fn no_such_key(code: Option<&str>, _message: Option<&str>) -> bool {
    code == Some("NoSuchKey")
}

// CloudFormation reports a missing stack as a ValidationError.
fn stack_does_not_exist(code: Option<&str>, message: Option<&str>) -> bool {
    code == Some("ValidationError") && message.is_some_and(|text| text.contains("does not exist"))
}

fn truncate_chars(message: &str, limit: usize) -> String {
    message.chars().take(limit).collect()
}

#[derive(Debug, Clone)]
pub struct CloudFormationProvider {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationProvider {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(config),
        }
    }
}

#[async_trait]
impl ResourceStateProvider for CloudFormationProvider {
    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetState, ProviderError> {
        let output = self
            .client
            .describe_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, stack_does_not_exist))?;

        Ok(ChangeSetState {
            status: output
                .status()
                .map(|status| ChangeSetStatus::from_wire(status.as_str()))
                .unwrap_or_else(|| ChangeSetStatus::Other("UNKNOWN".to_string())),
            reason: output.status_reason().map(str::to_string),
        })
    }

    async fn detect_drift(&self, stack_name: &str) -> Result<DriftDetectionHandle, ProviderError> {
        let output = self
            .client
            .detect_stack_drift()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, stack_does_not_exist))?;

        detection_handle(output.stack_drift_detection_id())
    }

    async fn describe_drift_detection_status(
        &self,
        handle: &DriftDetectionHandle,
    ) -> Result<DriftStatus, ProviderError> {
        let output = self
            .client
            .describe_stack_drift_detection_status()
            .stack_drift_detection_id(handle.as_str())
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, never_not_found))?;

        drift_status(
            output.detection_status().map(|status| status.as_str()),
            output.stack_drift_status().map(|status| status.as_str()),
        )
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError> {
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, never_not_found))
    }

    async fn update_stack(&self, request: &StackUpdateRequest) -> Result<String, ProviderError> {
        let parameters = request
            .parameters
            .iter()
            .map(|parameter| {
                Parameter::builder()
                    .parameter_key(&parameter.parameter_key)
                    .parameter_value(&parameter.parameter_value)
                    .build()
            })
            .collect::<Vec<_>>();
        let capabilities = request
            .capabilities
            .iter()
            .map(|capability| Capability::from(capability.as_str()))
            .collect::<Vec<_>>();

        let output = self
            .client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters))
            .set_capabilities(Some(capabilities))
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, stack_does_not_exist))?;

        Ok(output.stack_id().unwrap_or_default().to_string())
    }

    async fn describe_stack_parameters(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackParameter>, ProviderError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, stack_does_not_exist))?;

        let stack = output.stacks().first().ok_or_else(|| {
            ProviderError::not_found(format!("Stack [{stack_name}] does not exist"))
        })?;

        Ok(stack
            .parameters()
            .iter()
            .filter_map(|parameter| {
                Some(StackParameter::new(
                    parameter.parameter_key()?,
                    parameter.parameter_value().unwrap_or_default(),
                ))
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ProviderError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, parameter_not_found))?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::fatal(format!("parameter {name} has no value")))
    }

    async fn put_secure_parameter(&self, name: &str, value: &str) -> Result<(), ProviderError> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::SecureString)
            .overwrite(true)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, never_not_found))
    }
}

#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
}

impl S3ArtifactStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| classify_sdk_error(error, no_such_key))?;

        let body = output.body.collect().await.map_err(|error| {
            ProviderError::transient(format!("failed to read s3://{bucket}/{key}: {error}"))
        })?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        encryption: ServerSideEncryption,
    ) -> Result<(), ProviderError> {
        let server_side_encryption = match encryption {
            ServerSideEncryption::BucketDefault => None,
            ServerSideEncryption::Aes256 => Some(aws_sdk_s3::types::ServerSideEncryption::Aes256),
        };

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_server_side_encryption(server_side_encryption)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, never_not_found))
    }

    async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        copy_source: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .copy_object()
            .bucket(bucket)
            .key(key)
            .copy_source(copy_source)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, no_such_key))
    }
}

#[derive(Debug, Clone)]
pub struct CodePipelineReporter {
    client: aws_sdk_codepipeline::Client,
}

impl CodePipelineReporter {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_codepipeline::Client::new(config),
        }
    }
}

#[async_trait]
impl JobReporter for CodePipelineReporter {
    async fn put_job_success(&self, job_id: &str) -> Result<(), ProviderError> {
        self.client
            .put_job_success_result()
            .job_id(job_id)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, never_not_found))
    }

    async fn put_job_failure(
        &self,
        job_id: &str,
        failure: &FailureDetails,
    ) -> Result<(), ProviderError> {
        let details = PipelineFailureDetails::builder()
            .message(truncate_chars(&failure.message, MAX_FAILURE_MESSAGE_CHARS))
            .r#type(FailureType::JobFailed)
            .external_execution_id(&failure.external_execution_id)
            .build()
            .map_err(|error| ProviderError::fatal(format!("invalid failure details: {error}")))?;

        self.client
            .put_job_failure_result()
            .job_id(job_id)
            .failure_details(details)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| classify_sdk_error(error, never_not_found))
    }
}

#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(config: &SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(config),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| NotifyError::PublishFailed(DisplayErrorContext(&error).to_string()))
    }
}

fn detection_handle(detection_id: Option<&str>) -> Result<DriftDetectionHandle, ProviderError> {
    detection_id
        .map(DriftDetectionHandle::new)
        .ok_or_else(|| ProviderError::fatal("detect_stack_drift returned no detection id"))
}

fn drift_status(
    detection_status: Option<&str>,
    stack_drift_status: Option<&str>,
) -> Result<DriftStatus, ProviderError> {
    let detection_status = detection_status.ok_or_else(|| {
        ProviderError::fatal("drift detection status response had no detection status")
    })?;
    Ok(DriftStatus {
        detection_state: DetectionState::from_wire(detection_status),
        drift_result: DriftResult::from_wire(stack_drift_status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_stack_validation_error_is_not_found() {
        assert!(stack_does_not_exist(
            Some("ValidationError"),
            Some("Stack [primary] does not exist")
        ));
        assert!(!stack_does_not_exist(
            Some("ValidationError"),
            Some("Template format error")
        ));
        assert!(!stack_does_not_exist(Some("AccessDenied"), None));
    }

    #[test]
    fn only_parameter_not_found_code_counts_as_missing_parameter() {
        assert!(parameter_not_found(Some("ParameterNotFound"), None));
        assert!(!parameter_not_found(Some("AccessDeniedException"), None));
        assert!(!parameter_not_found(None, None));
    }

    #[test]
    fn failure_message_is_truncated_on_char_boundary() {
        let message = "é".repeat(10);
        assert_eq!(truncate_chars(&message, 3), "ééé");
    }

    #[test]
    fn missing_detection_id_is_fatal() {
        assert!(matches!(
            detection_handle(None),
            Err(ProviderError::Fatal(message)) if message.contains("no detection id")
        ));
        assert_eq!(
            detection_handle(Some("abc-123")).expect("handle").as_str(),
            "abc-123"
        );
    }

    #[test]
    fn missing_detection_status_is_fatal_not_failed() {
        assert!(matches!(
            drift_status(None, Some("DRIFTED")),
            Err(ProviderError::Fatal(_))
        ));
        let status = drift_status(Some("DETECTION_COMPLETE"), Some("DRIFTED")).expect("status");
        assert!(status.is_drifted());
    }
}
