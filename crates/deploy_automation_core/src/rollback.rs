use crate::contract::RollbackResponse;

pub const DIFFERENT_APPROVAL_MESSAGE: &str = "Different approval triggered.";
pub const ROLLBACK_ERROR_MESSAGE: &str = "Error occurred.";
pub const STAGE_STACK_CAPABILITIES: [&str; 3] = [
    "CAPABILITY_IAM",
    "CAPABILITY_NAMED_IAM",
    "CAPABILITY_AUTO_EXPAND",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// Deletion was requested by configuration.
    Forced,
    /// No artifact marker exists yet, so there is nothing to roll forward to.
    NoPriorDeployment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    DeleteTriggered(DeleteReason),
    UpdateTriggered { stack_id: String },
}

impl RollbackOutcome {
    // Downstream approval tooling matches on these exact strings.
    pub fn message(&self) -> String {
        match self {
            Self::DeleteTriggered(DeleteReason::Forced) => "Stack delete triggered.".to_string(),
            Self::DeleteTriggered(DeleteReason::NoPriorDeployment) => {
                "Stack delete triggerred.".to_string()
            }
            Self::UpdateTriggered { stack_id } => format!("Stack update triggerred: {stack_id}"),
        }
    }

    pub fn into_response(self) -> RollbackResponse {
        RollbackResponse::success(self.message())
    }
}

/// Regional virtual-hosted URL of a template uploaded for a stack update.
pub fn template_url(bucket: &str, region: &str, template_path: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{template_path}")
}
