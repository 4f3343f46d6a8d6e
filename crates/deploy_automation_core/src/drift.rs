use std::fmt;
use std::time::Duration;

pub const DEFAULT_DRIFT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Correlates a drift detection request with its status polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriftDetectionHandle(String);

impl DriftDetectionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriftDetectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    InProgress,
    Complete,
    Failed,
}

impl DetectionState {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "DETECTION_IN_PROGRESS" => Self::InProgress,
            "DETECTION_COMPLETE" => Self::Complete,
            _ => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftResult {
    Drifted,
    InSync,
    NotChecked,
}

impl DriftResult {
    /// Unknown or missing results count as not checked, never as drifted.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("DRIFTED") => Self::Drifted,
            Some("IN_SYNC") => Self::InSync,
            _ => Self::NotChecked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftStatus {
    pub detection_state: DetectionState,
    pub drift_result: DriftResult,
}

impl DriftStatus {
    pub fn in_progress() -> Self {
        Self {
            detection_state: DetectionState::InProgress,
            drift_result: DriftResult::NotChecked,
        }
    }

    pub fn complete(drift_result: DriftResult) -> Self {
        Self {
            detection_state: DetectionState::Complete,
            drift_result,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.detection_state == DetectionState::InProgress
    }

    pub fn is_drifted(&self) -> bool {
        self.drift_result == DriftResult::Drifted
    }
}

/// How drift status is polled until detection leaves the in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DRIFT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Stack names found drifted in one reconciliation run, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftedStacks(Vec<String>);

impl DriftedStacks {
    pub fn push(&mut self, stack_name: impl Into<String>) {
        self.0.push(stack_name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn notification_subject(&self) -> String {
        format!("Drift Detection on {}", self.0.join(" and "))
    }

    pub fn notification_message(&self) -> String {
        format!("Stack(s) drifted: {}", self.0.join(" and "))
    }
}
