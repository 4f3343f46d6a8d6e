//! Per-handler configuration.
//!
//! Each handler reads its settings once per invocation through a lookup
//! function (normally the process environment) and passes the resulting struct
//! down by reference. Variable names match the deployed function environment.

use std::time::Duration;

use thiserror::Error;

use crate::approval_gate::ExpectedApproval;
use crate::contract::ParameterSnapshot;
use crate::drift::{PollPolicy, DEFAULT_DRIFT_POLL_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// A stack and the region its provider client must target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTarget {
    pub stack_name: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetValidatorConfig {
    pub region: String,
    pub stack_name: String,
}

impl ChangeSetValidatorConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: required(&lookup, "REGION")?,
            stack_name: required(&lookup, "STACK_NAME")?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftDetectionConfig {
    pub primary: StackTarget,
    pub secondary: StackTarget,
    pub notification_topic_arn: String,
    pub poll: PollPolicy,
}

impl DriftDetectionConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval = match optional(&lookup, "DRIFT_POLL_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|error| {
                ConfigError::Invalid {
                    name: "DRIFT_POLL_INTERVAL_SECS",
                    reason: error.to_string(),
                }
            })?),
            None => DEFAULT_DRIFT_POLL_INTERVAL,
        };

        let max_attempts = match optional(&lookup, "DRIFT_MAX_POLL_ATTEMPTS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        name: "DRIFT_MAX_POLL_ATTEMPTS",
                        reason: "must be a positive integer".to_string(),
                    })
                }
                Ok(value) => Some(value),
                Err(error) => {
                    return Err(ConfigError::Invalid {
                        name: "DRIFT_MAX_POLL_ATTEMPTS",
                        reason: error.to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            primary: StackTarget {
                stack_name: required(&lookup, "PRIMARY_STACK")?,
                region: required(&lookup, "REGION")?,
            },
            secondary: StackTarget {
                stack_name: required(&lookup, "SECONDARY_STACK")?,
                region: required(&lookup, "SECONDARY_REGION")?,
            },
            notification_topic_arn: required(&lookup, "NOTIFICATION_SNS_ARN")?,
            poll: PollPolicy {
                interval,
                max_attempts,
            },
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackConfig {
    pub region: String,
    pub stage_stack_name: String,
    pub approval: ExpectedApproval,
    pub artifact_source_parameter: String,
    pub artifact_parameter_parameter: String,
    pub force_delete: bool,
    pub template_path: String,
}

impl RollbackConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: required(&lookup, "AWS_REGION")?,
            stage_stack_name: required(&lookup, "STAGE_STACK_NAME")?,
            approval: ExpectedApproval {
                pipeline: required(&lookup, "PIPELINE_NAME")?,
                stage: required(&lookup, "STAGE_NAME")?,
                action: required(&lookup, "ACTION_NAME")?,
            },
            artifact_source_parameter: required(&lookup, "ARTIFACT_SOURCE")?,
            artifact_parameter_parameter: required(&lookup, "ARTIFACT_PARAMETER")?,
            force_delete: optional(&lookup, "DELETE_STAGE_STACK").as_deref() == Some("Yes"),
            template_path: required(&lookup, "TEMPLATE_PATH")?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArtifactCreatorConfig {
    pub region: String,
    pub stack_name: String,
    pub artifact_source_parameter: String,
    pub artifact_parameter_parameter: String,
    pub artifact_source_name: String,
    pub artifact_parameter_name: String,
}

impl StageArtifactCreatorConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: required(&lookup, "REGION")?,
            stack_name: required(&lookup, "STACK_NAME")?,
            artifact_source_parameter: required(&lookup, "ARTIFACT_SOURCE")?,
            artifact_parameter_parameter: required(&lookup, "ARTIFACT_PARAMETER")?,
            artifact_source_name: required(&lookup, "ARTIFACT_SOURCE_NAME")?,
            artifact_parameter_name: required(&lookup, "ARTIFACT_PARAMETER_NAME")?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArtifactPutterConfig {
    pub region: String,
    pub artifact_source_parameter: String,
    pub artifact_parameter_parameter: String,
    pub stack_parameters: ParameterSnapshot,
}

impl StageArtifactPutterConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stack_parameters = match optional(&lookup, "CLOUDFORMATION_PARAMETERS") {
            Some(raw) => {
                ParameterSnapshot::parse(&raw).map_err(|error| ConfigError::Invalid {
                    name: "CLOUDFORMATION_PARAMETERS",
                    reason: error.to_string(),
                })?
            }
            None => ParameterSnapshot::default(),
        };

        Ok(Self {
            region: required(&lookup, "REGION")?,
            artifact_source_parameter: required(&lookup, "ARTIFACT_SOURCE")?,
            artifact_parameter_parameter: required(&lookup, "ARTIFACT_PARAMETER")?,
            stack_parameters,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    fn rollback_env(delete_stage_stack: &str) -> Vec<(&'static str, String)> {
        vec![
            ("AWS_REGION", "us-east-1".to_string()),
            ("STAGE_STACK_NAME", "stage-stack".to_string()),
            ("PIPELINE_NAME", "pipeline".to_string()),
            ("STAGE_NAME", "Stage-us-east-1".to_string()),
            ("ACTION_NAME", "ApproveChangeSet".to_string()),
            ("ARTIFACT_SOURCE", "/deploy/source-artifact".to_string()),
            ("ARTIFACT_PARAMETER", "/deploy/parameter-artifact".to_string()),
            ("DELETE_STAGE_STACK", delete_stage_stack.to_string()),
            ("TEMPLATE_PATH", "templates/template.yaml".to_string()),
        ]
    }

    #[test]
    fn rollback_force_delete_requires_exact_yes() {
        for (raw, expected) in [("Yes", true), ("No", false), ("yes", false), ("", false)] {
            let env = rollback_env(raw);
            let pairs: Vec<(&str, &str)> =
                env.iter().map(|(key, value)| (*key, value.as_str())).collect();
            let config = RollbackConfig::from_lookup(lookup_from(&pairs))
                .expect("rollback config should load");
            assert_eq!(config.force_delete, expected, "DELETE_STAGE_STACK={raw:?}");
        }
    }

    #[test]
    fn missing_variable_is_named_in_error() {
        let error = ChangeSetValidatorConfig::from_lookup(lookup_from(&[("REGION", "us-east-1")]))
            .expect_err("STACK_NAME is required");
        assert_eq!(error, ConfigError::Missing("STACK_NAME"));
        assert_eq!(error.to_string(), "STACK_NAME must be configured");
    }

    #[test]
    fn drift_config_defaults_to_three_second_unbounded_polling() {
        let config = DriftDetectionConfig::from_lookup(lookup_from(&[
            ("PRIMARY_STACK", "primary"),
            ("REGION", "us-east-1"),
            ("SECONDARY_STACK", "secondary"),
            ("SECONDARY_REGION", "us-west-2"),
            ("NOTIFICATION_SNS_ARN", "arn:aws:sns:us-east-1:111111111111:drift"),
        ]))
        .expect("drift config should load");

        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.poll.interval, Duration::from_secs(3));
        assert_eq!(config.secondary.region, "us-west-2");
    }

    #[test]
    fn drift_config_rejects_zero_poll_ceiling() {
        let error = DriftDetectionConfig::from_lookup(lookup_from(&[
            ("PRIMARY_STACK", "primary"),
            ("REGION", "us-east-1"),
            ("SECONDARY_STACK", "secondary"),
            ("SECONDARY_REGION", "us-west-2"),
            ("NOTIFICATION_SNS_ARN", "arn"),
            ("DRIFT_MAX_POLL_ATTEMPTS", "0"),
        ]))
        .expect_err("zero ceiling is invalid");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "DRIFT_MAX_POLL_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn putter_defaults_stack_parameters_to_empty() {
        let config = StageArtifactPutterConfig::from_lookup(lookup_from(&[
            ("REGION", "us-east-1"),
            ("ARTIFACT_SOURCE", "/deploy/source-artifact"),
            ("ARTIFACT_PARAMETER", "/deploy/parameter-artifact"),
        ]))
        .expect("putter config should load");

        assert!(config.stack_parameters.is_empty());
    }

    #[test]
    fn putter_rejects_malformed_stack_parameters() {
        let error = StageArtifactPutterConfig::from_lookup(lookup_from(&[
            ("REGION", "us-east-1"),
            ("ARTIFACT_SOURCE", "/deploy/source-artifact"),
            ("ARTIFACT_PARAMETER", "/deploy/parameter-artifact"),
            ("CLOUDFORMATION_PARAMETERS", "not-json"),
        ]))
        .expect_err("malformed parameters should fail");

        assert!(error.to_string().starts_with("CLOUDFORMATION_PARAMETERS is invalid"));
    }
}
