#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetStatus {
    Pending,
    Failed,
    Other(String),
}

impl ChangeSetStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "FAILED" => Self::Failed,
            pending if pending.ends_with("PENDING") => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Snapshot of a change set as returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetState {
    pub status: ChangeSetStatus,
    pub reason: Option<String>,
}

impl ChangeSetState {
    pub fn has_failed(&self) -> bool {
        self.status == ChangeSetStatus::Failed
    }

    pub fn failure_message(&self) -> String {
        self.reason
            .clone()
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| "Change set failed without a status reason".to_string())
    }
}
