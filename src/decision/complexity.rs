use std::collections::HashMap;

use serde_json::json;

use super::types::ReasoningEntry;
use crate::project::Task;

/// Keywords that historically blow up autonomous runs.
const COMPLEXITY_KEYWORDS: &[&str] = &[
    "authentication",
    "payment",
    "real-time",
    "websocket",
    "database migration",
    "third-party api",
    "oauth",
    "push notification",
    "background",
    "multi-tenant",
];

/// Keywords for low-risk, high-value screen work; they offset the risk score.
const VALUE_KEYWORDS: &[&str] = &[
    "core",
    "main",
    "basic",
    "simple",
    "list",
    "detail",
    "form",
    "navigation",
    "home",
    "screen",
];

pub(super) struct ComplexityScore {
    pub average: f64,
    #[allow(dead_code)]
    pub breakdown: HashMap<String, f64>,
}

/// Score each task in [0, 1] and average. The per-task score weighs risk
/// keyword hits against value keyword hits over the full task text,
/// including the prompt.
pub(super) fn score_complexity(tasks: &[Task], log: &mut Vec<ReasoningEntry>) -> ComplexityScore {
    let mut total = 0.0;
    let mut breakdown = HashMap::new();

    for task in tasks {
        let score = score_task(task);
        breakdown.insert(task.id.clone(), score);
        total += score;
    }

    let average = if tasks.is_empty() {
        0.0
    } else {
        total / tasks.len() as f64
    };

    log.push(ReasoningEntry::new(
        "complexity_scorer",
        json!({ "taskCount": tasks.len(), "breakdown": breakdown }),
        format!("Average complexity score: {:.2}", average),
        0.85,
    ));

    ComplexityScore { average, breakdown }
}

fn score_task(task: &Task) -> f64 {
    let text = format!("{} {} {}", task.title, task.description, task.prompt).to_lowercase();

    let complexity = COMPLEXITY_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count() as f64
        * 0.2;
    let value = VALUE_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count() as f64
        * 0.15;

    (complexity - value * 0.5 + 0.3).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_task_baseline() {
        let task = Task::new("t1", "Do work");
        assert!((score_task(&task) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_risk_keywords_raise_score() {
        let risky = Task::new("t1", "OAuth authentication with payment");
        let plain = Task::new("t2", "Do work");
        assert!(score_task(&risky) > score_task(&plain));
    }

    #[test]
    fn test_value_keywords_lower_score() {
        let valued = Task::new("t1", "Basic home screen list");
        let plain = Task::new("t2", "Do work");
        assert!(score_task(&valued) < score_task(&plain));
    }

    #[test]
    fn test_score_is_clamped() {
        let extreme = Task::new(
            "t1",
            "authentication payment real-time websocket oauth multi-tenant",
        )
        .with_description("database migration third-party api push notification background");
        let score = score_task(&extreme);
        assert!(score <= 1.0);

        let calm = Task::new("t2", "core main basic simple list detail")
            .with_description("form navigation home screen");
        assert!(score_task(&calm) >= 0.0);
    }

    #[test]
    fn test_average_over_empty_list_is_zero() {
        let mut log = Vec::new();
        let result = score_complexity(&[], &mut log);
        assert_eq!(result.average, 0.0);
        assert_eq!(log[0].rule, "complexity_scorer");
    }

    #[test]
    fn test_prompt_text_counts() {
        let task = Task::new("t1", "Integrate").with_prompt("wire up oauth and payment flows");
        assert!(score_task(&task) > 0.3);
    }
}
