//! Remediation hints for failed checks and tests.

/// Known failure types and how to address them.
const EXPLANATIONS: &[(&str, &str)] = &[
    (
        "gofmt",
        "Go files must be formatted using 'gofmt'. Run 'gofmt -w .' to fix formatting issues.",
    ),
    (
        "go vet",
        "Go vet found potential issues in your code. Review the errors and fix them before pushing.",
    ),
    (
        "golangci-lint",
        "The linter found code quality issues. Address the reported problems or configure exceptions in .golangci.yml.",
    ),
    (
        "rustfmt",
        "Rust files must be formatted using 'rustfmt'. Run 'cargo fmt' to fix formatting issues.",
    ),
    (
        "dart analyze",
        "Dart analyzer found issues. Run 'dart fix --apply' to auto-fix some issues.",
    ),
    (
        "flutter analyze",
        "Flutter analyzer found issues in your Flutter code. Review and fix them.",
    ),
    (
        "shellcheck",
        "Shellcheck found issues in your shell scripts. Review the suggestions and fix critical issues.",
    ),
    (
        "eslint",
        "ESLint found JavaScript/TypeScript issues. Run 'eslint --fix' to auto-fix some issues.",
    ),
    (
        "ruff",
        "Ruff found Python issues. Run 'ruff check --fix' to auto-fix some issues.",
    ),
    (
        "test",
        "Tests failed. Review the test output and fix failing tests before pushing.",
    ),
    (
        "timeout",
        "A command exceeded its time limit and was stopped. Speed it up or raise its timeout in the test configuration.",
    ),
];

/// Returns the known explanation for a failure type, if any.
#[must_use]
pub fn lookup(failure_type: &str) -> Option<&'static str> {
    EXPLANATIONS
        .iter()
        .find(|(name, _)| *name == failure_type)
        .map(|(_, text)| *text)
}

/// Builds a remediation hint, appending `details` when non-empty.
#[must_use]
pub fn explain(failure_type: &str, details: &str) -> String {
    let mut explanation = lookup(failure_type).map_or_else(
        || format!("Check '{failure_type}' failed. Review the details and fix the issues."),
        str::to_string,
    );

    if !details.is_empty() {
        explanation.push_str("\n\nDetails:\n");
        explanation.push_str(details);
    }

    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("gofmt", "gofmt -w .")]
    #[case("go vet", "Go vet")]
    #[case("golangci-lint", ".golangci.yml")]
    #[case("rustfmt", "cargo fmt")]
    #[case("dart analyze", "dart fix --apply")]
    #[case("flutter analyze", "Flutter")]
    #[case("shellcheck", "shell scripts")]
    #[case("eslint", "eslint --fix")]
    #[case("ruff", "ruff check --fix")]
    #[case("test", "Tests failed")]
    #[case("timeout", "time limit")]
    fn test_known_failure_types(#[case] failure_type: &str, #[case] fragment: &str) {
        let text = explain(failure_type, "");
        assert!(text.contains(fragment), "{text}");
        assert!(!text.contains("Details:"));
    }

    #[test]
    fn test_unknown_failure_type() {
        assert_eq!(
            explain("mypy", ""),
            "Check 'mypy' failed. Review the details and fix the issues."
        );
    }

    #[test]
    fn test_details_are_appended() {
        assert_eq!(
            explain("test", "unit: exit status 1"),
            "Tests failed. Review the test output and fix failing tests before pushing.\n\nDetails:\nunit: exit status 1"
        );
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(lookup("GOFMT").is_none());
        assert!(lookup("gofmt").is_some());
    }
}
