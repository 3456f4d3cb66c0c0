use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForemanError;

/// How much autonomy the engine is granted for a project.
///
/// More autonomous modes get a stricter complexity gate: the blast radius of
/// unattended execution has to shrink as human oversight drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyMode {
    Assist,
    #[default]
    Builder,
    Autopilot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Coding,
    Deployment,
}

/// Per-phase behavior for one autonomy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBehavior {
    pub planning: PlanningBehavior,
    pub coding: CodingBehavior,
    pub deployment: DeploymentBehavior,
    /// Unattended fix rounds granted per task before the failure escalates,
    /// whatever the failure category's own budget says.
    pub max_auto_fixes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningBehavior {
    Suggest,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingBehavior {
    Suggest,
    ExecuteWithApproval,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentBehavior {
    Suggest,
    ApprovalRequired,
    Auto,
}

impl AutonomyMode {
    pub fn behavior(&self) -> ModeBehavior {
        match self {
            Self::Assist => ModeBehavior {
                planning: PlanningBehavior::Suggest,
                coding: CodingBehavior::Suggest,
                deployment: DeploymentBehavior::Suggest,
                max_auto_fixes: 0,
            },
            Self::Builder => ModeBehavior {
                planning: PlanningBehavior::Execute,
                coding: CodingBehavior::ExecuteWithApproval,
                deployment: DeploymentBehavior::ApprovalRequired,
                max_auto_fixes: 2,
            },
            Self::Autopilot => ModeBehavior {
                planning: PlanningBehavior::Execute,
                coding: CodingBehavior::Execute,
                deployment: DeploymentBehavior::Auto,
                max_auto_fixes: 5,
            },
        }
    }

    /// Strictness factor for the complexity gate.
    pub fn strictness(&self) -> f64 {
        match self {
            Self::Assist => 0.5,
            Self::Builder => 0.7,
            Self::Autopilot => 0.9,
        }
    }

    pub fn requires_approval(&self, phase: Phase) -> bool {
        let behavior = self.behavior();
        match phase {
            Phase::Planning => false,
            Phase::Coding => behavior.coding == CodingBehavior::ExecuteWithApproval,
            Phase::Deployment => behavior.deployment == DeploymentBehavior::ApprovalRequired,
        }
    }

    pub fn auto_release(&self) -> bool {
        self.behavior().deployment == DeploymentBehavior::Auto
    }

    /// True when the engine should only propose: the decision and blueprint
    /// are returned to the caller and nothing is dispatched.
    pub fn suggest_only(&self) -> bool {
        self.behavior().coding == CodingBehavior::Suggest
    }

    pub fn max_auto_fixes(&self) -> u32 {
        self.behavior().max_auto_fixes
    }
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assist => "assist",
            Self::Builder => "builder",
            Self::Autopilot => "autopilot",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AutonomyMode {
    type Err = ForemanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assist" => Ok(Self::Assist),
            "builder" => Ok(Self::Builder),
            "autopilot" => Ok(Self::Autopilot),
            other => Err(ForemanError::Other(format!(
                "unknown autonomy mode: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictness_increases_with_autonomy() {
        assert!(AutonomyMode::Assist.strictness() < AutonomyMode::Builder.strictness());
        assert!(AutonomyMode::Builder.strictness() < AutonomyMode::Autopilot.strictness());
    }

    #[test]
    fn test_approval_phases() {
        assert!(AutonomyMode::Builder.requires_approval(Phase::Coding));
        assert!(AutonomyMode::Builder.requires_approval(Phase::Deployment));
        assert!(!AutonomyMode::Autopilot.requires_approval(Phase::Coding));
        assert!(!AutonomyMode::Assist.requires_approval(Phase::Coding));
    }

    #[test]
    fn test_only_autopilot_auto_releases() {
        assert!(AutonomyMode::Autopilot.auto_release());
        assert!(!AutonomyMode::Builder.auto_release());
        assert!(!AutonomyMode::Assist.auto_release());
    }

    #[test]
    fn test_auto_fix_budgets() {
        assert_eq!(AutonomyMode::Assist.max_auto_fixes(), 0);
        assert_eq!(AutonomyMode::Builder.max_auto_fixes(), 2);
        assert_eq!(AutonomyMode::Autopilot.max_auto_fixes(), 5);
    }

    #[test]
    fn test_only_assist_is_suggest_only() {
        assert!(AutonomyMode::Assist.suggest_only());
        assert!(!AutonomyMode::Builder.suggest_only());
        assert!(!AutonomyMode::Autopilot.suggest_only());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            "autopilot".parse::<AutonomyMode>().unwrap(),
            AutonomyMode::Autopilot
        );
        assert!("pilot".parse::<AutonomyMode>().is_err());
    }
}
