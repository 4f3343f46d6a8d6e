use crate::contract::ApprovalDetail;

/// The approval action whose state changes should drive a stage rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedApproval {
    pub pipeline: String,
    pub stage: String,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Match,
    NoMatch,
}

impl ExpectedApproval {
    pub fn evaluate(&self, detail: &ApprovalDetail) -> GateDecision {
        if detail.pipeline == self.pipeline
            && detail.stage == self.stage
            && detail.action == self.action
        {
            GateDecision::Match
        } else {
            GateDecision::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> ExpectedApproval {
        ExpectedApproval {
            pipeline: "mock-pipeline".to_string(),
            stage: "Stage-us-west-2".to_string(),
            action: "ApproveChangeSet".to_string(),
        }
    }

    fn detail(pipeline: &str, stage: &str, action: &str) -> ApprovalDetail {
        ApprovalDetail {
            pipeline: pipeline.to_string(),
            stage: stage.to_string(),
            action: action.to_string(),
            state: Some("FAILED".to_string()),
        }
    }

    #[test]
    fn matches_the_configured_triple() {
        assert_eq!(
            expected().evaluate(&detail("mock-pipeline", "Stage-us-west-2", "ApproveChangeSet")),
            GateDecision::Match
        );
    }

    #[test]
    fn any_differing_field_is_no_match() {
        let gate = expected();
        for candidate in [
            detail("other", "Stage-us-west-2", "ApproveChangeSet"),
            detail("mock-pipeline", "other", "ApproveChangeSet"),
            detail("mock-pipeline", "Stage-us-west-2", "other"),
        ] {
            assert_eq!(gate.evaluate(&candidate), GateDecision::NoMatch);
        }
    }
}
