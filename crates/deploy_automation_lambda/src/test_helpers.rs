//! In-memory fakes of the adapter traits plus event builders.
//!
//! Each fake records the calls it receives so tests can assert on ordering and
//! on which side effects did or did not happen.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use deploy_automation_core::change_set::ChangeSetState;
use deploy_automation_core::contract::{
    ApprovalDetail, ApprovalStateChangeEvent, ArtifactLocation, CodePipelineJob, FailureDetails,
    JobData, PipelineArtifact, S3Location, StackParameter,
};
use deploy_automation_core::drift::{DriftDetectionHandle, DriftResult, DriftStatus};
use deploy_automation_core::error::ProviderError;

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::notifier::{NotifyError, Notifier};
use crate::adapters::object_store::{ArtifactStore, ServerSideEncryption};
use crate::adapters::parameter_store::ParameterStore;
use crate::adapters::resource_state::{ResourceStateProvider, StackUpdateRequest};
use crate::archive::single_entry_archive;
use crate::deadline::{Invocation, InvocationBudget};

pub const TEST_REQUEST_ID: &str = "test-request-id";
pub const TEST_UPDATED_STACK_ID: &str =
    "arn:aws:cloudformation:us-east-1:111111111111:stack/stage/updated";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("poisoned mutex")
}

/// An invocation with a full Lambda budget, for tests that never time out.
pub fn invocation() -> Invocation {
    Invocation::new(
        TEST_REQUEST_ID,
        InvocationBudget::new(Duration::from_secs(900)),
    )
}

pub fn invocation_with_budget(budget: Duration) -> Invocation {
    Invocation::new(TEST_REQUEST_ID, InvocationBudget::new(budget))
}

pub fn artifact(name: &str, bucket: &str, key: &str) -> PipelineArtifact {
    PipelineArtifact {
        name: name.to_string(),
        location: ArtifactLocation {
            s3_location: S3Location::new(bucket, key),
        },
    }
}

pub fn pipeline_job(
    job_id: &str,
    input_artifacts: Vec<PipelineArtifact>,
    output_artifacts: Vec<PipelineArtifact>,
) -> CodePipelineJob {
    CodePipelineJob {
        id: job_id.to_string(),
        data: JobData {
            input_artifacts,
            output_artifacts,
        },
    }
}

pub fn approval_event(pipeline: &str, stage: &str, action: &str) -> ApprovalStateChangeEvent {
    ApprovalStateChangeEvent {
        detail: ApprovalDetail {
            pipeline: pipeline.to_string(),
            stage: stage.to_string(),
            action: action.to_string(),
            state: Some("SUCCEEDED".to_string()),
        },
    }
}

/// A source bundle holding a single template entry.
pub fn template_bundle(template_path: &str, template: &str) -> Vec<u8> {
    single_entry_archive(template_path, template.as_bytes()).expect("bundle should build")
}

#[derive(Default)]
pub struct FakeParameterStore {
    values: Mutex<HashMap<String, String>>,
    failures: HashMap<String, ProviderError>,
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl FakeParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, name: &str, value: &str) -> Self {
        lock(&self.values).insert(name.to_string(), value.to_string());
        self
    }

    /// Reads and writes of `name` fail with `error`.
    pub fn with_failure(mut self, name: &str, error: ProviderError) -> Self {
        self.failures.insert(name.to_string(), error);
        self
    }

    pub fn value(&self, name: &str) -> Option<String> {
        lock(&self.values).get(name).cloned()
    }

    pub fn reads(&self) -> Vec<String> {
        lock(&self.reads).clone()
    }

    /// Successful writes in call order.
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ProviderError> {
        lock(&self.reads).push(name.to_string());
        if let Some(error) = self.failures.get(name) {
            return Err(error.clone());
        }
        lock(&self.values)
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("ParameterNotFound: {name}")))
    }

    async fn put_secure_parameter(&self, name: &str, value: &str) -> Result<(), ProviderError> {
        if let Some(error) = self.failures.get(name) {
            return Err(error.clone());
        }
        lock(&self.values).insert(name.to_string(), value.to_string());
        lock(&self.writes).push((name.to_string(), value.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub encryption: ServerSideEncryption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub bucket: String,
    pub key: String,
    pub copy_source: String,
}

#[derive(Default)]
pub struct FakeArtifactStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    puts: Mutex<Vec<PutRecord>>,
    copies: Mutex<Vec<CopyRecord>>,
    get_failure: Option<ProviderError>,
    put_failure: Option<ProviderError>,
    copy_failure: Option<ProviderError>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, body: Vec<u8>) -> Self {
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), body);
        self
    }

    pub fn failing_get(mut self, error: ProviderError) -> Self {
        self.get_failure = Some(error);
        self
    }

    pub fn failing_put(mut self, error: ProviderError) -> Self {
        self.put_failure = Some(error);
        self
    }

    pub fn failing_copy(mut self, error: ProviderError) -> Self {
        self.copy_failure = Some(error);
        self
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        lock(&self.puts).clone()
    }

    pub fn copies(&self) -> Vec<CopyRecord> {
        lock(&self.copies).clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError> {
        if let Some(error) = &self.get_failure {
            return Err(error.clone());
        }
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("NoSuchKey: {bucket}/{key}")))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        encryption: ServerSideEncryption,
    ) -> Result<(), ProviderError> {
        if let Some(error) = &self.put_failure {
            return Err(error.clone());
        }
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), body.clone());
        lock(&self.puts).push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            encryption,
        });
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        copy_source: &str,
    ) -> Result<(), ProviderError> {
        if let Some(error) = &self.copy_failure {
            return Err(error.clone());
        }
        lock(&self.copies).push(CopyRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            copy_source: copy_source.to_string(),
        });
        Ok(())
    }
}

/// One call received by [`FakeResourceState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    DescribeChangeSet {
        stack_name: String,
        change_set_name: String,
    },
    DetectDrift(String),
    DescribeDriftStatus(String),
    DeleteStack(String),
    UpdateStack(StackUpdateRequest),
    DescribeStackParameters(String),
}

/// Scripted resource-state provider for one region.
///
/// Drift detection on a stack returns the handle `"{stack}-detection"` unless
/// a detect error is scripted. Status polls pop the scripted sequence for that
/// handle and keep returning its last entry; an unscripted handle is complete
/// and in sync.
pub struct FakeResourceState {
    change_set: Result<ChangeSetState, ProviderError>,
    detect_failures: HashMap<String, ProviderError>,
    statuses: Mutex<HashMap<String, VecDeque<Result<DriftStatus, ProviderError>>>>,
    delete_failure: Option<ProviderError>,
    update_result: Result<String, ProviderError>,
    stack_parameters: HashMap<String, Result<Vec<StackParameter>, ProviderError>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl Default for FakeResourceState {
    fn default() -> Self {
        Self {
            change_set: Err(ProviderError::fatal("ChangeSetNotFound")),
            detect_failures: HashMap::new(),
            statuses: Mutex::new(HashMap::new()),
            delete_failure: None,
            update_result: Ok(TEST_UPDATED_STACK_ID.to_string()),
            stack_parameters: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detection_handle(stack_name: &str) -> DriftDetectionHandle {
        DriftDetectionHandle::new(format!("{stack_name}-detection"))
    }

    pub fn with_change_set(mut self, state: ChangeSetState) -> Self {
        self.change_set = Ok(state);
        self
    }

    pub fn with_change_set_error(mut self, error: ProviderError) -> Self {
        self.change_set = Err(error);
        self
    }

    pub fn with_detect_failure(mut self, stack_name: &str, error: ProviderError) -> Self {
        self.detect_failures.insert(stack_name.to_string(), error);
        self
    }

    pub fn with_drift_statuses(self, stack_name: &str, statuses: Vec<DriftStatus>) -> Self {
        self.with_drift_poll_results(stack_name, statuses.into_iter().map(Ok).collect())
    }

    pub fn with_drift_poll_results(
        self,
        stack_name: &str,
        results: Vec<Result<DriftStatus, ProviderError>>,
    ) -> Self {
        let handle = Self::detection_handle(stack_name);
        lock(&self.statuses).insert(handle.as_str().to_string(), results.into());
        self
    }

    pub fn failing_delete(mut self, error: ProviderError) -> Self {
        self.delete_failure = Some(error);
        self
    }

    pub fn failing_update(mut self, error: ProviderError) -> Self {
        self.update_result = Err(error);
        self
    }

    pub fn with_stack_parameters(
        mut self,
        stack_name: &str,
        parameters: Vec<StackParameter>,
    ) -> Self {
        self.stack_parameters
            .insert(stack_name.to_string(), Ok(parameters));
        self
    }

    pub fn with_stack_parameters_error(mut self, stack_name: &str, error: ProviderError) -> Self {
        self.stack_parameters
            .insert(stack_name.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn update_requests(&self) -> Vec<StackUpdateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::UpdateStack(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_stacks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::DeleteStack(stack_name) => Some(stack_name),
                _ => None,
            })
            .collect()
    }

    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ProviderCall::DescribeDriftStatus(_)))
            .count()
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl ResourceStateProvider for FakeResourceState {
    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetState, ProviderError> {
        self.record(ProviderCall::DescribeChangeSet {
            stack_name: stack_name.to_string(),
            change_set_name: change_set_name.to_string(),
        });
        self.change_set.clone()
    }

    async fn detect_drift(&self, stack_name: &str) -> Result<DriftDetectionHandle, ProviderError> {
        self.record(ProviderCall::DetectDrift(stack_name.to_string()));
        match self.detect_failures.get(stack_name) {
            Some(error) => Err(error.clone()),
            None => Ok(Self::detection_handle(stack_name)),
        }
    }

    async fn describe_drift_detection_status(
        &self,
        handle: &DriftDetectionHandle,
    ) -> Result<DriftStatus, ProviderError> {
        self.record(ProviderCall::DescribeDriftStatus(handle.as_str().to_string()));
        let mut statuses = lock(&self.statuses);
        let Some(queue) = statuses.get_mut(handle.as_str()) else {
            return Ok(DriftStatus::complete(DriftResult::InSync));
        };
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.unwrap_or_else(|| Ok(DriftStatus::complete(DriftResult::InSync)))
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::DeleteStack(stack_name.to_string()));
        match &self.delete_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn update_stack(&self, request: &StackUpdateRequest) -> Result<String, ProviderError> {
        self.record(ProviderCall::UpdateStack(request.clone()));
        self.update_result.clone()
    }

    async fn describe_stack_parameters(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackParameter>, ProviderError> {
        self.record(ProviderCall::DescribeStackParameters(stack_name.to_string()));
        self.stack_parameters
            .get(stack_name)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProviderError::not_found(format!(
                    "Stack with id {stack_name} does not exist"
                )))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedResult {
    Success { job_id: String },
    Failure { job_id: String, failure: FailureDetails },
}

/// Records every report attempt, including ones that fail.
#[derive(Default)]
pub struct FakeJobReporter {
    reports: Mutex<Vec<ReportedResult>>,
    failure: Option<ProviderError>,
}

impl FakeJobReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn reports(&self) -> Vec<ReportedResult> {
        lock(&self.reports).clone()
    }

    pub fn success_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|report| matches!(report, ReportedResult::Success { .. }))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|report| matches!(report, ReportedResult::Failure { .. }))
            .count()
    }

    /// Message of the single failure reported so far.
    pub fn failure_message(&self) -> Option<String> {
        self.reports().into_iter().find_map(|report| match report {
            ReportedResult::Failure { failure, .. } => Some(failure.message),
            ReportedResult::Success { .. } => None,
        })
    }

    fn outcome(&self) -> Result<(), ProviderError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JobReporter for FakeJobReporter {
    async fn put_job_success(&self, job_id: &str) -> Result<(), ProviderError> {
        lock(&self.reports).push(ReportedResult::Success {
            job_id: job_id.to_string(),
        });
        self.outcome()
    }

    async fn put_job_failure(
        &self,
        job_id: &str,
        failure: &FailureDetails,
    ) -> Result<(), ProviderError> {
        lock(&self.reports).push(ReportedResult::Failure {
            job_id: job_id.to_string(),
            failure: failure.clone(),
        });
        self.outcome()
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    published: Mutex<Vec<(String, String)>>,
    failing: bool,
    stalled: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Records the publication, then never settles.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::default()
        }
    }

    /// Attempted publications as `(subject, message)`.
    pub fn published(&self) -> Vec<(String, String)> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        lock(&self.published).push((subject.to_string(), message.to_string()));
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(NotifyError::PublishFailed("topic unavailable".to_string()));
        }
        Ok(())
    }
}
