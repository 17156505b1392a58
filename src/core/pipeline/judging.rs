use std::ops::ControlFlow;

use itertools::Itertools;

use crate::core::{
    domain::{
        ExecutionResult, JudgeStatus, JudgeVerdict, SubmissionState, TestCase, TestOutcome,
    },
    errors::SandboxError,
    sandbox::{Prepared, Sandbox},
};

/// Runs a submission against its test cases and derives a verdict.
#[derive(Clone, Debug)]
pub struct Judge {
    sandbox: Sandbox,
}

impl Judge {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Test cases are evaluated one after another in ascending `order`. A
    /// wrong answer does not stop the run, a timeout or crash does.
    ///
    /// The source is compiled once and the artifact reused for every case.
    #[tracing::instrument(skip(self, code, test_cases), fields(tests = test_cases.len()))]
    pub async fn judge(
        &self,
        code: &str,
        language_id: &str,
        test_cases: &[TestCase],
    ) -> Result<JudgeVerdict, SandboxError> {
        let language = self.sandbox.resolve(language_id)?;
        let mut run = JudgeRun::new(test_cases.len());

        if test_cases.is_empty() {
            return Ok(run.finish());
        }

        let artifact = match self.sandbox.prepare(code, language).await? {
            Prepared::Ready(artifact) => artifact,
            Prepared::Rejected(result) => return Ok(run.compile_error(result)),
        };

        run.change_state(SubmissionState::Running);
        for test_case in test_cases.iter().sorted_by_key(|test_case| test_case.order) {
            tracing::debug!("Running test case {}", test_case.id);
            let result = self.sandbox.run(&artifact, &test_case.input).await?;
            if run.record(test_case, result).is_break() {
                break;
            }
        }

        Ok(run.finish())
    }
}

/// Accumulates outcomes while a submission is being judged.
#[derive(Debug)]
struct JudgeRun {
    state: SubmissionState,
    status: JudgeStatus,
    tests_passed: usize,
    tests_total: usize,
    total_runtime_ms: u64,
    outcomes: Vec<TestOutcome>,
    error_message: Option<String>,
}

impl JudgeRun {
    fn new(tests_total: usize) -> Self {
        Self {
            state: SubmissionState::Pending,
            status: JudgeStatus::Accepted,
            tests_passed: 0,
            tests_total,
            total_runtime_ms: 0,
            outcomes: Vec::with_capacity(tests_total),
            error_message: None,
        }
    }

    fn change_state(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("Submission state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn compile_error(mut self, result: ExecutionResult) -> JudgeVerdict {
        self.status = self.status.escalate(JudgeStatus::CompileError);
        self.error_message = result.error;
        self.finish()
    }

    fn record(&mut self, test_case: &TestCase, result: ExecutionResult) -> ControlFlow<()> {
        let actual = result.stdout.trim_end();
        let hard_failure = result.is_hard_failure();
        let passed = actual == test_case.expected.trim_end();

        if passed {
            self.tests_passed += 1;
        } else {
            self.status = self.status.escalate(JudgeStatus::WrongAnswer);
        }
        self.total_runtime_ms += result.wall_time_ms;
        self.outcomes.push(TestOutcome {
            test_case_id: test_case.id.clone(),
            passed,
            actual: actual.to_string(),
            runtime_ms: result.wall_time_ms,
            error: result.error.clone(),
        });

        if !hard_failure {
            return ControlFlow::Continue(());
        }

        let status = if result.timed_out {
            JudgeStatus::TimeLimitExceeded
        } else {
            JudgeStatus::RuntimeError
        };
        tracing::debug!("Test case {} stopped the run: {}", test_case.id, status);
        self.status = self.status.escalate(status);
        self.error_message = result.error;
        ControlFlow::Break(())
    }

    fn finish(mut self) -> JudgeVerdict {
        self.change_state(SubmissionState::Finished(self.status));
        tracing::info!(
            "Verdict {} ({}/{} passed, {} ms)",
            self.status,
            self.tests_passed,
            self.tests_total,
            self.total_runtime_ms
        );

        JudgeVerdict {
            status: self.status,
            tests_passed: self.tests_passed,
            tests_total: self.tests_total,
            total_runtime_ms: self.total_runtime_ms,
            outcomes: self.outcomes,
            error_message: self.error_message,
        }
    }
}
