//! Error-line extraction from raw command output.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const MAX_ERROR_LINES: usize = 20;
const MAX_LINE_LENGTH: usize = 500;
const FALLBACK_TAIL_LINES: usize = 10;

fn compiler_location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]+\.tsx?\(\d+,\d+\):").unwrap())
}

/// Distills a failed command's combined output into reportable lines.
///
/// Lines carrying a recognizable failure marker are kept; when nothing
/// matches, the tail of the output is used so a failure never comes back
/// empty-handed. The result is deduplicated in order and capped.
pub fn extract_errors(stdout: &str, stderr: &str) -> Vec<String> {
    let combined = format!("{}\n{}", stdout, stderr);
    let mut errors: Vec<String> = Vec::new();

    for line in combined.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.chars().count() >= MAX_LINE_LENGTH {
            continue;
        }
        if has_failure_marker(trimmed) {
            errors.push(trimmed.to_string());
        }
    }

    if errors.is_empty() && !combined.trim().is_empty() {
        let lines: Vec<String> = combined
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let skip = lines.len().saturating_sub(FALLBACK_TAIL_LINES);
        errors = lines[skip..].to_vec();
    }

    let mut seen = HashSet::new();
    errors.retain(|line| seen.insert(line.clone()));
    errors.truncate(MAX_ERROR_LINES);
    errors
}

fn has_failure_marker(line: &str) -> bool {
    line.contains("error")
        || line.contains("Error")
        || line.contains("ERR!")
        || line.contains("failed")
        || line.contains("Failed")
        || compiler_location_pattern().is_match(line)
}
