use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForemanError;

/// Lifecycle status of a project.
///
/// `PendingPlan` waits for the planning agent's task breakdown, `PendingFix`
/// waits for its fix proposal after an escalated verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    PendingPlan,
    #[default]
    Running,
    PendingFix,
    AwaitingApproval,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn allowed_transitions(&self) -> &'static [ProjectStatus] {
        use ProjectStatus::*;
        match self {
            PendingPlan => &[Running, Failed],
            Running => &[PendingFix, AwaitingApproval, Failed],
            PendingFix => &[Running, Failed],
            AwaitingApproval => &[Completed],
            Completed => &[],
            Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: ProjectStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }

    /// Statuses where a coding-agent run may be in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, ProjectStatus::Running | ProjectStatus::PendingFix)
    }

    /// Statuses waiting on an asynchronous planner reply.
    pub fn awaits_planner(&self) -> bool {
        matches!(self, ProjectStatus::PendingPlan | ProjectStatus::PendingFix)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingPlan => "pending_plan",
            Self::Running => "running",
            Self::PendingFix => "pending_fix",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ProjectStatus {
    type Err = ForemanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_plan" => Ok(Self::PendingPlan),
            "running" => Ok(Self::Running),
            "pending_fix" => Ok(Self::PendingFix),
            "awaiting_approval" => Ok(Self::AwaitingApproval),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ForemanError::Other(format!(
                "unknown project status: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(ProjectStatus::PendingPlan.can_transition_to(ProjectStatus::Running));
        assert!(ProjectStatus::Running.can_transition_to(ProjectStatus::PendingFix));
        assert!(ProjectStatus::Running.can_transition_to(ProjectStatus::AwaitingApproval));
        assert!(ProjectStatus::PendingFix.can_transition_to(ProjectStatus::Running));
        assert!(ProjectStatus::AwaitingApproval.can_transition_to(ProjectStatus::Completed));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!ProjectStatus::Completed.can_transition_to(ProjectStatus::Running));
        assert!(!ProjectStatus::Failed.can_transition_to(ProjectStatus::Running));
        assert!(!ProjectStatus::AwaitingApproval.can_transition_to(ProjectStatus::Running));
        assert!(!ProjectStatus::PendingPlan.can_transition_to(ProjectStatus::AwaitingApproval));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProjectStatus::Completed.is_terminal());
        assert!(ProjectStatus::Failed.is_terminal());
        assert!(!ProjectStatus::Running.is_terminal());
        assert!(!ProjectStatus::AwaitingApproval.is_terminal());
    }

    #[test]
    fn test_display_round_trip() {
        for status in [
            ProjectStatus::PendingPlan,
            ProjectStatus::Running,
            ProjectStatus::PendingFix,
            ProjectStatus::AwaitingApproval,
            ProjectStatus::Completed,
            ProjectStatus::Failed,
        ] {
            let parsed: ProjectStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
