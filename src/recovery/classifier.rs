use std::sync::OnceLock;

use regex::Regex;

use super::types::FailureCategory;

static DEPENDENCY_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static SYNTAX_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static ARCHITECTURE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static ENVIRONMENT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

fn dependency_patterns() -> &'static [Regex] {
    DEPENDENCY_PATTERNS.get_or_init(|| {
        compile(&[
            "cannot find module",
            "module not found",
            "npm err",
            r"package\.json",
            "install",
            "dependency",
            "peer dep",
            "E404",
        ])
    })
}

fn syntax_patterns() -> &'static [Regex] {
    SYNTAX_PATTERNS.get_or_init(|| {
        compile(&[
            "unexpected token",
            "syntax error",
            "parsing error",
            "expected",
            r"TS\d{4}",
            "TypeError",
            "ReferenceError",
        ])
    })
}

fn architecture_patterns() -> &'static [Regex] {
    ARCHITECTURE_PATTERNS.get_or_init(|| {
        compile(&[
            "circular",
            "import.*from",
            "export",
            "component.*not found",
            "hook.*rules",
            "invalid hook",
        ])
    })
}

fn environment_patterns() -> &'static [Regex] {
    ENVIRONMENT_PATTERNS.get_or_init(|| {
        compile(&[
            "ENOENT",
            "EACCES",
            "permission denied",
            "port.*in use",
            "timeout",
            "network",
            "expo.*config",
            r"app\.json",
        ])
    })
}

/// Map raw verification output to a failure category.
///
/// First match wins, in fixed priority order: dependency, then syntax, then
/// architecture, then environment. Dependency goes first because dependency
/// breakage routinely masquerades as syntax or import errors downstream.
pub fn classify_failure(errors: &[String], stderr: Option<&str>) -> FailureCategory {
    let mut combined = errors.join("\n");
    combined.push('\n');
    combined.push_str(stderr.unwrap_or(""));

    let sets: [(&[Regex], FailureCategory); 4] = [
        (dependency_patterns(), FailureCategory::Dependency),
        (syntax_patterns(), FailureCategory::Syntax),
        (architecture_patterns(), FailureCategory::Architecture),
        (environment_patterns(), FailureCategory::Environment),
    ];

    for (patterns, category) in sets {
        if patterns.iter().any(|p| p.is_match(&combined)) {
            return category;
        }
    }

    FailureCategory::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(lines: &[&str]) -> FailureCategory {
        let errors: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        classify_failure(&errors, None)
    }

    #[test]
    fn test_dependency_errors() {
        assert_eq!(
            classify(&["Cannot find module 'x'"]),
            FailureCategory::Dependency
        );
        assert_eq!(
            classify(&["npm ERR! code E404"]),
            FailureCategory::Dependency
        );
        assert_eq!(
            classify(&["peer dep conflict in react"]),
            FailureCategory::Dependency
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(classify(&["Unexpected token"]), FailureCategory::Syntax);
        assert_eq!(
            classify(&["error TS2304: name not found"]),
            FailureCategory::Syntax
        );
        assert_eq!(
            classify(&["ReferenceError: foo is not defined"]),
            FailureCategory::Syntax
        );
    }

    #[test]
    fn test_architecture_errors() {
        assert_eq!(
            classify(&["circular reference detected"]),
            FailureCategory::Architecture
        );
        assert_eq!(
            classify(&["Invalid hook call"]),
            FailureCategory::Architecture
        );
    }

    #[test]
    fn test_environment_errors() {
        assert_eq!(
            classify(&["ENOENT: no such file"]),
            FailureCategory::Environment
        );
        assert_eq!(
            classify(&["EACCES: permission denied"]),
            FailureCategory::Environment
        );
        assert_eq!(
            classify(&["port 3000 already in use"]),
            FailureCategory::Environment
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(classify(&["Something broke"]), FailureCategory::Unknown);
        assert_eq!(classify(&[]), FailureCategory::Unknown);
    }

    #[test]
    fn test_dependency_priority_over_syntax() {
        // Both "cannot find module" and "expected" are present; dependency
        // is checked first.
        assert_eq!(
            classify(&["Cannot find module 'y'", "expected ';'"]),
            FailureCategory::Dependency
        );
    }

    #[test]
    fn test_stderr_is_considered() {
        let category = classify_failure(&[], Some("npm ERR! missing script"));
        assert_eq!(category, FailureCategory::Dependency);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(classify(&["SYNTAX ERROR near line 3"]), FailureCategory::Syntax);
        assert_eq!(classify(&["ts2532: object possibly undefined"]), FailureCategory::Syntax);
    }
}
