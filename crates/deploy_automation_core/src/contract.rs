use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::EventError;

pub const RESPONSE_STATUS_SUCCESS: &str = "SUCCESS";
pub const STAGE_PARAMETERS_KEY: &str = "StageParameters";
pub const STAGE_CONFIGURATION_FILE_NAME: &str = "parameters.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodePipelineEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: CodePipelineJob,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodePipelineJob {
    pub id: String,
    #[serde(default)]
    pub data: JobData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub input_artifacts: Vec<PipelineArtifact>,
    #[serde(default)]
    pub output_artifacts: Vec<PipelineArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineArtifact {
    pub name: String,
    pub location: ArtifactLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub s3_location: S3Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket_name: String,
    pub object_key: String,
}

impl S3Location {
    pub fn new(bucket_name: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            object_key: object_key.into(),
        }
    }

    /// `bucket/key` form expected by a server-side object copy.
    pub fn copy_source(&self) -> String {
        format!("{}/{}", self.bucket_name, self.object_key)
    }
}

impl CodePipelineJob {
    pub fn first_input_artifact(&self) -> Result<&PipelineArtifact, EventError> {
        self.data
            .input_artifacts
            .first()
            .ok_or(EventError::MissingInputArtifact)
    }

    pub fn output_artifact(&self, name: &str) -> Result<&PipelineArtifact, EventError> {
        self.data
            .output_artifacts
            .iter()
            .find(|artifact| artifact.name == name)
            .ok_or_else(|| EventError::MissingOutputArtifact(name.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalStateChangeEvent {
    pub detail: ApprovalDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalDetail {
    pub pipeline: String,
    pub stage: String,
    pub action: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Running,
    Stopped,
}

/// Envelope returned by every pipeline-job handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub status: String,
    pub pipeline_state: PipelineState,
}

impl PipelineResponse {
    pub fn new(pipeline_state: PipelineState) -> Self {
        Self {
            status: RESPONSE_STATUS_SUCCESS.to_string(),
            pipeline_state,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub result: RollbackStatus,
    pub result_message: String,
}

impl RollbackResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: RollbackStatus::Success,
            result_message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: RollbackStatus::Error,
            result_message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureKind {
    JobFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub external_execution_id: String,
}

/// Terminal outcome of one pipeline job invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Succeeded,
    Failed(FailureDetails),
}

impl JobResult {
    pub fn failed(message: impl Into<String>, external_execution_id: impl Into<String>) -> Self {
        Self::Failed(FailureDetails {
            message: message.into(),
            kind: FailureKind::JobFailed,
            external_execution_id: external_execution_id.into(),
        })
    }

    pub fn pipeline_state(&self) -> PipelineState {
        match self {
            Self::Succeeded => PipelineState::Running,
            Self::Failed(_) => PipelineState::Stopped,
        }
    }
}

/// Pointer to the last artifact that deployed successfully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMarker {
    pub source_bucket: String,
    pub source_key: String,
}

impl ArtifactMarker {
    pub fn from_location(location: &S3Location) -> Self {
        Self {
            source_bucket: location.bucket_name.clone(),
            source_key: location.object_key.clone(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn location(&self) -> S3Location {
        S3Location::new(&self.source_bucket, &self.source_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StackParameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter_key: key.into(),
            parameter_value: value.into(),
        }
    }
}

/// Named stack parameter overrides, kept in the order they were written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ParameterSnapshot(IndexMap<String, String>);

impl ParameterSnapshot {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Parses the `StageParameters` value of a deployed stack, where an empty
    /// string means no overrides.
    pub fn from_stage_parameter_value(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::parse(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_stack_parameters(&self) -> Vec<StackParameter> {
        self.0
            .iter()
            .map(|(key, value)| StackParameter::new(key, value))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Body of the `parameters.json` entry in a staged parameter artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageConfiguration {
    #[serde(rename = "Parameters")]
    pub parameters: ParameterSnapshot,
}
