#![allow(dead_code)]

use deploy_automation_lambda::runtime::contract::{ApprovalStateChangeEvent, CodePipelineEvent};
use serde_json::json;

pub const PIPELINE: &str = "app-pipeline";
pub const STAGE: &str = "Stage";
pub const ACTION: &str = "ApproveStage";

/// An approval state-change event as delivered by EventBridge.
pub fn approval_state_change(
    pipeline: &str,
    stage: &str,
    action: &str,
) -> ApprovalStateChangeEvent {
    serde_json::from_value(json!({
        "version": "0",
        "id": "4c2a7f0b-41a2-4f7e-9d51-0d8b0c0e3b1a",
        "detail-type": "CodePipeline Action Execution State Change",
        "source": "aws.codepipeline",
        "region": "us-east-1",
        "detail": {
            "pipeline": pipeline,
            "execution-id": "01234567-0123-0123-0123-012345678901",
            "stage": stage,
            "action": action,
            "state": "SUCCEEDED",
            "type": {"owner": "AWS", "category": "Approval", "provider": "Manual", "version": "1"}
        }
    }))
    .expect("approval event fixture should parse")
}

/// A pipeline job invoking a Lambda action with no artifacts.
pub fn bare_pipeline_job(job_id: &str) -> CodePipelineEvent {
    serde_json::from_value(json!({
        "CodePipeline.job": {
            "id": job_id,
            "accountId": "111111111111",
            "data": {
                "actionConfiguration": {"configuration": {"FunctionName": "drift-detection"}},
                "inputArtifacts": [],
                "outputArtifacts": []
            }
        }
    }))
    .expect("pipeline job fixture should parse")
}
