mod support;

use deploy_automation_lambda::handlers::drift_detection::{
    handle_drift_detection, DriftDetectionDeps,
};
use deploy_automation_lambda::handlers::rollback_change::{handle_rollback_event, RollbackDeps};
use deploy_automation_lambda::runtime::config::{DriftDetectionConfig, RollbackConfig};
use deploy_automation_lambda::runtime::contract::{
    PipelineState, RollbackStatus, StackParameter,
};
use deploy_automation_lambda::runtime::drift::{DriftResult, DriftStatus};
use deploy_automation_lambda::test_helpers::{
    invocation, template_bundle, FakeArtifactStore, FakeJobReporter, FakeNotifier,
    FakeParameterStore, FakeResourceState, ReportedResult, TEST_UPDATED_STACK_ID,
};
use support::events::{approval_state_change, bare_pipeline_job, ACTION, PIPELINE, STAGE};

const TEMPLATE_PATH: &str = "templates/stage.template";

fn rollback_config() -> RollbackConfig {
    let env = [
        ("AWS_REGION", "us-east-1"),
        ("STAGE_STACK_NAME", "app-stage"),
        ("PIPELINE_NAME", PIPELINE),
        ("STAGE_NAME", STAGE),
        ("ACTION_NAME", ACTION),
        ("ARTIFACT_SOURCE", "/app/source-artifact"),
        ("ARTIFACT_PARAMETER", "/app/parameter-artifact"),
        ("DELETE_STAGE_STACK", "No"),
        ("TEMPLATE_PATH", TEMPLATE_PATH),
    ];
    RollbackConfig::from_lookup(|name| {
        env.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .expect("rollback config should load")
}

fn drift_config() -> DriftDetectionConfig {
    let env = [
        ("PRIMARY_STACK", "app-primary"),
        ("REGION", "us-east-1"),
        ("SECONDARY_STACK", "app-secondary"),
        ("SECONDARY_REGION", "us-west-2"),
        ("NOTIFICATION_SNS_ARN", "arn:aws:sns:us-east-1:111111111111:drift"),
    ];
    DriftDetectionConfig::from_lookup(|name| {
        env.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .expect("drift config should load")
}

#[tokio::test]
async fn approved_stage_rolls_forward_to_recorded_artifact() {
    let provider = FakeResourceState::new();
    let parameters = FakeParameterStore::new()
        .with_value("/app/source-artifact", r#"{"sourceBucket":"b","sourceKey":"k"}"#)
        .with_value("/app/parameter-artifact", r#"{"p1":"v1"}"#);
    let artifacts = FakeArtifactStore::new().with_object(
        "b",
        "k",
        template_bundle(TEMPLATE_PATH, "Resources: {}"),
    );
    let deps = RollbackDeps {
        provider: &provider,
        parameters: &parameters,
        artifacts: &artifacts,
    };

    let response = handle_rollback_event(
        &approval_state_change(PIPELINE, STAGE, ACTION),
        &invocation(),
        &rollback_config(),
        &deps,
    )
    .await;

    assert_eq!(response.result, RollbackStatus::Success);
    assert_eq!(
        response.result_message,
        format!("Stack update triggerred: {TEST_UPDATED_STACK_ID}")
    );
    assert_eq!(artifacts.puts().len(), 1);
    assert_eq!(artifacts.puts()[0].key, TEMPLATE_PATH);

    let updates = provider.update_requests();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].stack_name, "app-stage");
    assert_eq!(updates[0].parameters, vec![StackParameter::new("p1", "v1")]);
    assert!(provider.deleted_stacks().is_empty());
}

#[tokio::test]
async fn first_approval_without_marker_deletes_stage() {
    let provider = FakeResourceState::new();
    let parameters = FakeParameterStore::new();
    let artifacts = FakeArtifactStore::new();
    let deps = RollbackDeps {
        provider: &provider,
        parameters: &parameters,
        artifacts: &artifacts,
    };

    let response = handle_rollback_event(
        &approval_state_change(PIPELINE, STAGE, ACTION),
        &invocation(),
        &rollback_config(),
        &deps,
    )
    .await;

    assert_eq!(
        serde_json::to_value(&response).expect("serialize"),
        serde_json::json!({"result": "SUCCESS", "resultMessage": "Stack delete triggerred."})
    );
    assert_eq!(provider.deleted_stacks(), vec!["app-stage".to_string()]);
    assert!(artifacts.puts().is_empty());
    assert!(provider.update_requests().is_empty());
}

#[tokio::test]
async fn drift_in_primary_only_notifies_about_primary() {
    let primary = FakeResourceState::new().with_drift_statuses(
        "app-primary",
        vec![
            DriftStatus::in_progress(),
            DriftStatus::complete(DriftResult::Drifted),
        ],
    );
    let secondary = FakeResourceState::new().with_drift_statuses(
        "app-secondary",
        vec![DriftStatus::complete(DriftResult::InSync)],
    );
    let notifier = FakeNotifier::new();
    let reporter = FakeJobReporter::new();
    let deps = DriftDetectionDeps {
        primary: &primary,
        secondary: &secondary,
        notifier: &notifier,
        reporter: &reporter,
    };
    let event = bare_pipeline_job("job-drift");

    let response = handle_drift_detection(&event.job, &invocation(), &drift_config(), &deps)
        .await
        .expect("drift check should succeed");

    assert_eq!(response.status, "SUCCESS");
    assert_eq!(response.pipeline_state, PipelineState::Running);
    assert_eq!(
        notifier.published(),
        vec![(
            "Drift Detection on app-primary".to_string(),
            "Stack(s) drifted: app-primary".to_string()
        )]
    );
    assert_eq!(
        reporter.reports(),
        vec![ReportedResult::Success {
            job_id: "job-drift".to_string()
        }]
    );
}
