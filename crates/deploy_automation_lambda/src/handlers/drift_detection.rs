//! Drift reconciliation across the primary and secondary regional stacks.

use deploy_automation_core::config::DriftDetectionConfig;
use deploy_automation_core::contract::{CodePipelineJob, PipelineResponse};
use deploy_automation_core::drift::{DetectionState, DriftedStacks, PollPolicy};
use deploy_automation_core::error::ProviderError;
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::adapters::job_reporter::JobReporter;
use crate::adapters::notifier::Notifier;
use crate::adapters::resource_state::ResourceStateProvider;
use crate::deadline::{race_deadline, Invocation};
use crate::error::HandlerError;
use crate::job_result::JobResultSender;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("drift detection on {stack_name} still in progress after {attempts} status checks")]
    PollLimitExceeded { stack_name: String, attempts: u32 },
}

/// A stack to check, paired with the provider for its region.
pub struct DriftTarget<'a> {
    pub stack_name: &'a str,
    pub provider: &'a dyn ResourceStateProvider,
}

pub struct DriftDetectionDeps<'a> {
    pub primary: &'a dyn ResourceStateProvider,
    pub secondary: &'a dyn ResourceStateProvider,
    pub notifier: &'a dyn Notifier,
    pub reporter: &'a dyn JobReporter,
}

/// Checks every target in order and collects the drifted ones. The first
/// provider failure other than a missing stack aborts the whole check.
pub async fn check_drift(
    targets: &[DriftTarget<'_>],
    policy: &PollPolicy,
) -> Result<DriftedStacks, DriftError> {
    let mut drifted = DriftedStacks::default();
    for target in targets {
        if is_drifted(target, policy).await? {
            drifted.push(target.stack_name);
        }
    }
    Ok(drifted)
}

async fn is_drifted(target: &DriftTarget<'_>, policy: &PollPolicy) -> Result<bool, DriftError> {
    let handle = match target.provider.detect_drift(target.stack_name).await {
        Ok(handle) => handle,
        Err(error) if error.is_not_found() => {
            info!(
                stack_name = target.stack_name,
                %error,
                "stack does not exist, skipping drift check"
            );
            return Ok(false);
        }
        Err(error) => return Err(error.into()),
    };

    let mut attempts = 0_u32;
    loop {
        let status = target
            .provider
            .describe_drift_detection_status(&handle)
            .await?;
        attempts += 1;

        if !status.is_in_progress() {
            if status.detection_state == DetectionState::Failed {
                warn!(
                    stack_name = target.stack_name,
                    detection_id = %handle,
                    "drift detection failed, stack treated as not drifted"
                );
            }
            info!(
                stack_name = target.stack_name,
                drift_result = ?status.drift_result,
                attempts,
                "drift detection finished"
            );
            return Ok(status.is_drifted());
        }

        if policy.max_attempts.is_some_and(|limit| attempts >= limit) {
            return Err(DriftError::PollLimitExceeded {
                stack_name: target.stack_name.to_string(),
                attempts,
            });
        }
        tokio::time::sleep(policy.interval).await;
    }
}

/// Publishes one notification for the drifted stacks. Delivery failures are
/// logged and never change the job result. The caller bounds the publish with
/// whatever budget the drift check left over.
pub async fn notify_drift(notifier: &dyn Notifier, drifted: &DriftedStacks) {
    if drifted.is_empty() {
        return;
    }

    let subject = drifted.notification_subject();
    match notifier
        .publish(&subject, &drifted.notification_message())
        .await
    {
        Ok(()) => info!(stacks = ?drifted.names(), "drift notification sent"),
        Err(error) => warn!(%error, %subject, "failed to send drift notification"),
    }
}

pub async fn handle_drift_detection(
    job: &CodePipelineJob,
    invocation: &Invocation,
    config: &DriftDetectionConfig,
    deps: &DriftDetectionDeps<'_>,
) -> Result<PipelineResponse, HandlerError> {
    let sender = JobResultSender::new(deps.reporter, &job.id, &invocation.request_id);
    let targets = [
        DriftTarget {
            stack_name: &config.primary.stack_name,
            provider: deps.primary,
        },
        DriftTarget {
            stack_name: &config.secondary.stack_name,
            provider: deps.secondary,
        },
    ];

    let started = Instant::now();
    let check = check_drift(&targets, &config.poll);
    let drifted = match race_deadline(invocation.budget, check).await {
        Ok(Ok(drifted)) => drifted,
        Ok(Err(error)) => return sender.fail_and_raise(error.into()).await,
        Err(exceeded) => return sender.fail_and_raise(exceeded.into()).await,
    };

    let left = invocation.budget.remaining().saturating_sub(started.elapsed());
    if timeout(left, notify_drift(deps.notifier, &drifted)).await.is_err() {
        warn!(
            stacks = ?drifted.names(),
            budget_ms = left.as_millis() as u64,
            "drift notification did not settle before the deadline"
        );
    }

    info!(job_id = %job.id, drifted = drifted.names().len(), "drift check complete");
    sender.succeed().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use deploy_automation_core::config::StackTarget;
    use deploy_automation_core::contract::PipelineState;
    use deploy_automation_core::drift::{DriftResult, DriftStatus};

    use super::*;
    use crate::test_helpers::{
        invocation, invocation_with_budget, pipeline_job, FakeJobReporter, FakeNotifier,
        FakeResourceState, ProviderCall,
    };

    fn config(poll: PollPolicy) -> DriftDetectionConfig {
        DriftDetectionConfig {
            primary: StackTarget {
                stack_name: "app-primary".to_string(),
                region: "us-east-1".to_string(),
            },
            secondary: StackTarget {
                stack_name: "app-secondary".to_string(),
                region: "us-west-2".to_string(),
            },
            notification_topic_arn: "arn:aws:sns:us-east-1:111111111111:drift".to_string(),
            poll,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_detection_completes() {
        let provider = FakeResourceState::new().with_drift_statuses(
            "app-primary",
            vec![
                DriftStatus::in_progress(),
                DriftStatus::in_progress(),
                DriftStatus::complete(DriftResult::Drifted),
            ],
        );
        let targets = [DriftTarget {
            stack_name: "app-primary",
            provider: &provider,
        }];

        let drifted = check_drift(&targets, &PollPolicy::default())
            .await
            .expect("check should succeed");

        assert_eq!(drifted.names(), ["app-primary".to_string()]);
        assert_eq!(provider.status_polls(), 3);
    }

    #[tokio::test]
    async fn missing_stack_is_not_drifted() {
        let primary = FakeResourceState::new()
            .with_detect_failure("app-primary", ProviderError::not_found("does not exist"));
        let secondary = FakeResourceState::new().with_drift_statuses(
            "app-secondary",
            vec![DriftStatus::complete(DriftResult::Drifted)],
        );
        let targets = [
            DriftTarget {
                stack_name: "app-primary",
                provider: &primary,
            },
            DriftTarget {
                stack_name: "app-secondary",
                provider: &secondary,
            },
        ];

        let drifted = check_drift(&targets, &PollPolicy::default())
            .await
            .expect("check should succeed");

        assert_eq!(drifted.names(), ["app-secondary".to_string()]);
        assert_eq!(primary.status_polls(), 0);
    }

    #[tokio::test]
    async fn unknown_result_is_never_drifted() {
        let provider = FakeResourceState::new().with_drift_statuses(
            "app-primary",
            vec![DriftStatus::complete(DriftResult::from_wire(Some("UNKNOWN")))],
        );
        let targets = [DriftTarget {
            stack_name: "app-primary",
            provider: &provider,
        }];

        let drifted = check_drift(&targets, &PollPolicy::default())
            .await
            .expect("check should succeed");
        assert!(drifted.is_empty());
    }

    #[tokio::test]
    async fn detect_failure_aborts_before_later_targets() {
        let primary = FakeResourceState::new()
            .with_detect_failure("app-primary", ProviderError::fatal("AccessDenied"));
        let secondary = FakeResourceState::new();
        let targets = [
            DriftTarget {
                stack_name: "app-primary",
                provider: &primary,
            },
            DriftTarget {
                stack_name: "app-secondary",
                provider: &secondary,
            },
        ];

        let error = check_drift(&targets, &PollPolicy::default())
            .await
            .expect_err("check should abort");

        assert!(matches!(error, DriftError::Provider(ProviderError::Fatal(_))));
        assert!(secondary.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_limit_stops_endless_detection() {
        let provider = FakeResourceState::new()
            .with_drift_statuses("app-primary", vec![DriftStatus::in_progress()]);
        let targets = [DriftTarget {
            stack_name: "app-primary",
            provider: &provider,
        }];
        let policy = PollPolicy {
            interval: Duration::from_secs(3),
            max_attempts: Some(4),
        };

        let error = check_drift(&targets, &policy)
            .await
            .expect_err("poll limit should trip");

        assert!(matches!(
            error,
            DriftError::PollLimitExceeded { attempts: 4, .. }
        ));
        assert_eq!(provider.status_polls(), 4);
    }

    #[tokio::test]
    async fn drifted_stacks_notify_once_and_report_success() {
        let primary = FakeResourceState::new().with_drift_statuses(
            "app-primary",
            vec![DriftStatus::complete(DriftResult::Drifted)],
        );
        let secondary = FakeResourceState::new().with_drift_statuses(
            "app-secondary",
            vec![DriftStatus::complete(DriftResult::Drifted)],
        );
        let notifier = FakeNotifier::new();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let response = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation(),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect("handler should succeed");

        assert_eq!(response.pipeline_state, PipelineState::Running);
        assert_eq!(
            notifier.published(),
            vec![(
                "Drift Detection on app-primary and app-secondary".to_string(),
                "Stack(s) drifted: app-primary and app-secondary".to_string()
            )]
        );
        assert_eq!(reporter.success_count(), 1);
        assert_eq!(reporter.failure_count(), 0);
    }

    #[tokio::test]
    async fn in_sync_stacks_send_no_notification() {
        let primary = FakeResourceState::new();
        let secondary = FakeResourceState::new();
        let notifier = FakeNotifier::new();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation(),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect("handler should succeed");

        assert!(notifier.published().is_empty());
        assert_eq!(
            primary.calls(),
            vec![
                ProviderCall::DetectDrift("app-primary".to_string()),
                ProviderCall::DescribeDriftStatus("app-primary-detection".to_string()),
            ]
        );
        assert_eq!(reporter.success_count(), 1);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_the_job() {
        let primary = FakeResourceState::new().with_drift_statuses(
            "app-primary",
            vec![DriftStatus::complete(DriftResult::Drifted)],
        );
        let secondary = FakeResourceState::new();
        let notifier = FakeNotifier::failing();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let response = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation(),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect("handler should succeed");

        assert_eq!(response.pipeline_state, PipelineState::Running);
        assert_eq!(notifier.published().len(), 1);
        assert_eq!(reporter.success_count(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_reported_then_raised() {
        let primary = FakeResourceState::new()
            .with_detect_failure("app-primary", ProviderError::transient("Throttling"));
        let secondary = FakeResourceState::new();
        let notifier = FakeNotifier::new();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let error = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation(),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect_err("handler should raise");

        assert!(matches!(error, HandlerError::Drift(DriftError::Provider(_))));
        assert_eq!(reporter.failure_count(), 1);
        assert_eq!(reporter.success_count(), 0);
        assert!(notifier.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_exactly_one_failure() {
        let primary = FakeResourceState::new()
            .with_drift_statuses("app-primary", vec![DriftStatus::in_progress()]);
        let secondary = FakeResourceState::new();
        let notifier = FakeNotifier::new();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let error = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation_with_budget(Duration::from_secs(10)),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect_err("handler should time out");

        assert!(matches!(error, HandlerError::Deadline(_)));
        assert_eq!(reporter.failure_count(), 1);
        assert_eq!(
            reporter.failure_message().as_deref(),
            Some("Processing the event timed out")
        );
        assert!(secondary.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_notification_still_reports_success() {
        let primary = FakeResourceState::new().with_drift_statuses(
            "app-primary",
            vec![DriftStatus::complete(DriftResult::Drifted)],
        );
        let secondary = FakeResourceState::new();
        let notifier = FakeNotifier::stalled();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let response = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation_with_budget(Duration::from_secs(60)),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect("handler should succeed");

        assert_eq!(response.pipeline_state, PipelineState::Running);
        assert_eq!(notifier.published().len(), 1);
        assert_eq!(reporter.success_count(), 1);
        assert_eq!(reporter.failure_count(), 0);
    }

    #[tokio::test]
    async fn both_stacks_missing_succeeds_without_notification() {
        let primary = FakeResourceState::new()
            .with_detect_failure("app-primary", ProviderError::not_found("does not exist"));
        let secondary = FakeResourceState::new()
            .with_detect_failure("app-secondary", ProviderError::not_found("does not exist"));
        let notifier = FakeNotifier::new();
        let reporter = FakeJobReporter::new();
        let deps = DriftDetectionDeps {
            primary: &primary,
            secondary: &secondary,
            notifier: &notifier,
            reporter: &reporter,
        };

        let response = handle_drift_detection(
            &pipeline_job("job-1", vec![], vec![]),
            &invocation(),
            &config(PollPolicy::default()),
            &deps,
        )
        .await
        .expect("handler should succeed");

        assert_eq!(response.pipeline_state, PipelineState::Running);
        assert!(notifier.published().is_empty());
        assert_eq!(primary.status_polls(), 0);
        assert_eq!(secondary.status_polls(), 0);
        assert_eq!(reporter.success_count(), 1);
        assert_eq!(reporter.failure_count(), 0);
    }
}
