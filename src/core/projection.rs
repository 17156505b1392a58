use std::collections::HashMap;

use serde::Serialize;

use crate::core::domain::{JudgeStatus, JudgeVerdict, TestCase, TestOutcome};

pub const HIDDEN_MARKER: &str = "[Hidden]";

/// A verdict as shown to the submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionView {
    pub status: JudgeStatus,
    pub tests_passed: usize,
    pub tests_total: usize,
    pub total_runtime_ms: u64,
    pub error_message: Option<String>,
    pub results: Vec<OutcomeView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutcomeView {
    pub test_case_id: String,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    pub runtime_ms: u64,
    pub error: Option<String>,
    pub is_hidden: bool,
}

/// Hidden test cases keep their content private while they pass. A failing
/// hidden case is shown in full.
pub fn project(verdict: &JudgeVerdict, test_cases: &[TestCase]) -> SubmissionView {
    let by_id: HashMap<&str, &TestCase> = test_cases
        .iter()
        .map(|test_case| (test_case.id.as_str(), test_case))
        .collect();

    let mut error_message = verdict.error_message.clone();
    let results = verdict
        .outcomes
        .iter()
        .map(|outcome| {
            let test_case = by_id.get(outcome.test_case_id.as_str()).copied();
            if is_redacted(outcome, test_case) {
                // the run may have stopped on this case; its diagnostic is hidden too
                if outcome.error.is_some() && outcome.error == error_message {
                    error_message = Some(HIDDEN_MARKER.to_string());
                }
                redacted_view(outcome)
            } else {
                outcome_view(outcome, test_case)
            }
        })
        .collect();

    SubmissionView {
        status: verdict.status,
        tests_passed: verdict.tests_passed,
        tests_total: verdict.tests_total,
        total_runtime_ms: verdict.total_runtime_ms,
        error_message,
        results,
    }
}

fn is_redacted(outcome: &TestOutcome, test_case: Option<&TestCase>) -> bool {
    outcome.passed && test_case.is_some_and(|test_case| test_case.is_hidden)
}

fn redacted_view(outcome: &TestOutcome) -> OutcomeView {
    OutcomeView {
        test_case_id: outcome.test_case_id.clone(),
        input: HIDDEN_MARKER.to_string(),
        expected: HIDDEN_MARKER.to_string(),
        actual: HIDDEN_MARKER.to_string(),
        passed: true,
        runtime_ms: outcome.runtime_ms,
        error: outcome.error.as_ref().map(|_| HIDDEN_MARKER.to_string()),
        is_hidden: true,
    }
}

fn outcome_view(outcome: &TestOutcome, test_case: Option<&TestCase>) -> OutcomeView {
    let (input, expected, is_hidden) = match test_case {
        Some(test_case) => (
            test_case.input.clone(),
            test_case.expected.clone(),
            test_case.is_hidden,
        ),
        None => (String::new(), String::new(), false),
    };

    OutcomeView {
        test_case_id: outcome.test_case_id.clone(),
        input,
        expected,
        actual: outcome.actual.clone(),
        passed: outcome.passed,
        runtime_ms: outcome.runtime_ms,
        error: outcome.error.clone(),
        is_hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_case;

    fn outcome(id: &str, passed: bool, actual: &str) -> TestOutcome {
        TestOutcome {
            test_case_id: id.to_string(),
            passed,
            actual: actual.to_string(),
            runtime_ms: 7,
            error: None,
        }
    }

    fn verdict(outcomes: Vec<TestOutcome>) -> JudgeVerdict {
        let tests_passed = outcomes.iter().filter(|o| o.passed).count();
        JudgeVerdict {
            status: if tests_passed == outcomes.len() {
                JudgeStatus::Accepted
            } else {
                JudgeStatus::WrongAnswer
            },
            tests_passed,
            tests_total: outcomes.len(),
            total_runtime_ms: 7 * outcomes.len() as u64,
            outcomes,
            error_message: None,
        }
    }

    #[test]
    fn test_hidden_passing_case_is_redacted() {
        let mut hidden = test_case("h", "secret input", "secret output", 0);
        hidden.is_hidden = true;

        let view = project(&verdict(vec![outcome("h", true, "secret output")]), &[hidden]);

        let result = &view.results[0];
        assert!(result.is_hidden);
        assert!(result.passed);
        assert_eq!(result.input, HIDDEN_MARKER);
        assert_eq!(result.expected, HIDDEN_MARKER);
        assert_eq!(result.actual, HIDDEN_MARKER);
    }

    #[test]
    fn test_hidden_passing_case_hides_its_stderr() {
        let mut hidden = test_case("h", "SECRET_INPUT", "ok", 0);
        hidden.is_hidden = true;
        let mut verdict = verdict(vec![TestOutcome {
            error: Some("SECRET_INPUT\n".to_string()),
            ..outcome("h", true, "ok")
        }]);
        verdict.status = JudgeStatus::RuntimeError;
        verdict.error_message = Some("SECRET_INPUT\n".to_string());

        let view = project(&verdict, &[hidden]);

        assert_eq!(view.results[0].error.as_deref(), Some(HIDDEN_MARKER));
        assert_eq!(view.error_message.as_deref(), Some(HIDDEN_MARKER));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("SECRET_INPUT"));
    }

    #[test]
    fn test_hidden_failing_case_keeps_its_stderr() {
        let mut hidden = test_case("h", "2 3", "5", 0);
        hidden.is_hidden = true;
        let mut verdict = verdict(vec![TestOutcome {
            error: Some("Traceback: boom".to_string()),
            ..outcome("h", false, "")
        }]);
        verdict.status = JudgeStatus::RuntimeError;
        verdict.error_message = Some("Traceback: boom".to_string());

        let view = project(&verdict, &[hidden]);

        assert_eq!(view.results[0].error.as_deref(), Some("Traceback: boom"));
        assert_eq!(view.error_message.as_deref(), Some("Traceback: boom"));
    }

    #[test]
    fn test_hidden_failing_case_is_shown() {
        let mut hidden = test_case("h", "2 3", "5", 0);
        hidden.is_hidden = true;

        let view = project(&verdict(vec![outcome("h", false, "6")]), &[hidden]);

        let result = &view.results[0];
        assert!(result.is_hidden);
        assert_eq!(result.input, "2 3");
        assert_eq!(result.expected, "5");
        assert_eq!(result.actual, "6");
    }

    #[test]
    fn test_visible_cases_and_summary_are_copied() {
        let cases = [test_case("a", "1", "1", 0), test_case("b", "2", "2", 1)];
        let verdict = verdict(vec![outcome("a", true, "1"), outcome("b", false, "3")]);

        let view = project(&verdict, &cases);

        assert_eq!(view.status, JudgeStatus::WrongAnswer);
        assert_eq!(view.tests_passed, 1);
        assert_eq!(view.tests_total, 2);
        assert_eq!(view.total_runtime_ms, 14);
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.results[0].input, "1");
        assert_eq!(view.results[1].actual, "3");
        assert!(!view.results[1].is_hidden);
    }

    #[test]
    fn test_unknown_case_id_is_not_hidden() {
        let view = project(&verdict(vec![outcome("ghost", true, "x")]), &[]);
        assert!(!view.results[0].is_hidden);
        assert_eq!(view.results[0].input, "");
        assert_eq!(view.results[0].actual, "x");
    }

    #[test]
    fn test_view_serializes_snake_case_status() {
        let view = project(&verdict(vec![]), &[]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["results"], serde_json::json!([]));
    }
}
