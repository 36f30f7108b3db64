//! Step state machine.

use serde::{Deserialize, Serialize};

/// The state of one saga step.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Completed ──► Failed (being reversed)
///           └──► Failed ─────► Pending (compensated)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet run, or rolled back.
    #[default]
    Pending,

    /// The owning service reported success.
    Completed,

    /// The step failed, or its effect is being reversed.
    Failed,
}

impl StepStatus {
    /// Returns true if `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Completed)
                | (StepStatus::Pending, StepStatus::Failed)
                | (StepStatus::Completed, StepStatus::Failed)
                | (StepStatus::Failed, StepStatus::Pending)
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
