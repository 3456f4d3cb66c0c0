//! Deterministic idea-to-blueprint templates.
//!
//! A blueprint frames the project before any agent is involved: the MVP
//! feature list seeds the default bootstrap task, the rest is provenance
//! recorded alongside the decision. Template choice is literal keyword
//! lookup; same idea, same blueprint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeBlueprint {
    pub mvp_features: Vec<String>,
    pub risks: Vec<Risk>,
    pub monetization: Vec<String>,
    pub architecture: Vec<String>,
    pub phases: Vec<PhaseEstimate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub risk: String,
    pub severity: Severity,
    pub mitigation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEstimate {
    pub phase: String,
    pub description: String,
    pub estimated_tasks: u32,
    pub order: u32,
}

const FITNESS_FEATURES: [&str; 5] = [
    "Workout logging",
    "Goal tracking",
    "Basic stats display",
    "Simple calendar view",
    "User preferences",
];

const SOCIAL_FEATURES: [&str; 5] = [
    "User auth (basic)",
    "Feed/list view",
    "Create post",
    "Profile view",
    "Basic notifications",
];

const ECOMMERCE_FEATURES: [&str; 5] = [
    "Product list",
    "Product detail",
    "Cart (basic)",
    "Checkout flow",
    "Order confirmation",
];

const DEFAULT_FEATURES: [&str; 5] = [
    "App scaffolding and navigation",
    "Core data models",
    "Main screen(s)",
    "Basic CRUD or list/detail flow",
    "Simple styling and layout",
];

pub fn generate_blueprint(idea: &str) -> OutcomeBlueprint {
    let lower = idea.to_lowercase();

    let features: &[&str] = if ["fitness", "workout", "exercise"]
        .iter()
        .any(|k| lower.contains(k))
    {
        &FITNESS_FEATURES
    } else if ["social", "feed", "post"].iter().any(|k| lower.contains(k)) {
        &SOCIAL_FEATURES
    } else if ["shop", "store", "cart"].iter().any(|k| lower.contains(k)) {
        &ECOMMERCE_FEATURES
    } else {
        &DEFAULT_FEATURES
    };

    OutcomeBlueprint {
        mvp_features: features.iter().map(|s| s.to_string()).collect(),
        risks: vec![
            Risk {
                risk: String::from("Scope creep"),
                severity: Severity::Medium,
                mitigation: String::from("Strict MVP-first, defer non-core features"),
            },
            Risk {
                risk: String::from("Third-party API limits"),
                severity: Severity::Low,
                mitigation: String::from("Use mock data for development"),
            },
            Risk {
                risk: String::from("Platform-specific bugs"),
                severity: Severity::Low,
                mitigation: String::from("Test on both iOS and Android early"),
            },
        ],
        monetization: vec![
            String::from("Freemium: Core free, premium features paid"),
            String::from("One-time purchase for full unlock"),
            String::from("Subscription for recurring value (e.g. sync, analytics)"),
        ],
        architecture: vec![
            String::from("Expo + React Native"),
            String::from("File-based navigation (Expo Router)"),
            String::from("Zustand for state"),
            String::from("API layer in src/api"),
        ],
        phases: vec![
            PhaseEstimate {
                phase: String::from("Phase 1: Foundation"),
                description: String::from("Scaffold, nav, core screens"),
                estimated_tasks: 3,
                order: 1,
            },
            PhaseEstimate {
                phase: String::from("Phase 2: Core Logic"),
                description: String::from("Data flow, main features"),
                estimated_tasks: 4,
                order: 2,
            },
            PhaseEstimate {
                phase: String::from("Phase 3: Polish"),
                description: String::from("Styling, edge cases, validation"),
                estimated_tasks: 2,
                order: 3,
            },
        ],
    }
}
