use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Ran (\d+) tests?").unwrap());
static FAILURES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FAILED \([^)]*?failures=(\d+)").unwrap());
static ERRORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FAILED \([^)]*?errors=(\d+)").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub test_name: String,
    pub passed: bool,
    pub error_message: Option<String>,
    pub execution_time: f64,
}

impl TestCaseResult {
    fn passed(n: usize) -> Self {
        Self {
            test_name: format!("Test_{}", n),
            passed: true,
            error_message: None,
            execution_time: 0.0,
        }
    }

    fn failed(n: usize) -> Self {
        Self {
            test_name: format!("Test_{}", n),
            passed: false,
            error_message: Some("Test failed - check implementation".to_string()),
            execution_time: 0.0,
        }
    }

    /// A single failed entry standing in for a run that produced no counts.
    pub fn execution_failure(message: impl Into<String>) -> Self {
        Self {
            test_name: "Test Execution".to_string(),
            passed: false,
            error_message: Some(message.into()),
            execution_time: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub execution_time: f64,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub test_results: Vec<TestCaseResult>,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            execution_time,
            memory_usage: 0.0,
            cpu_usage: 0.0,
            test_results: Vec::new(),
        }
    }
}

fn capture_count(re: &Regex, output: &str) -> usize {
    re.captures(output)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Turn `unittest` console output into per-test results. Never empty.
///
/// unittest only reports totals, so entries are synthesised: passes first,
/// then one failure per reported failure or error.
pub fn parse_unittest_output(output: &str) -> Vec<TestCaseResult> {
    if !output.contains("Ran ") {
        let message = if output.trim().is_empty() {
            "No tests were executed"
        } else {
            output
        };
        return vec![TestCaseResult::execution_failure(message)];
    }

    let Some(total) = RAN_RE
        .captures(output)
        .and_then(|c| c[1].parse::<usize>().ok())
    else {
        return vec![TestCaseResult::execution_failure("Could not parse test results")];
    };

    let mut results = Vec::new();
    if output.contains("FAILED") || output.contains("ERROR") {
        let failed = (capture_count(&FAILURES_RE, output) + capture_count(&ERRORS_RE, output))
            .min(total);
        let passed = total - failed;
        results.extend((1..=passed).map(TestCaseResult::passed));
        results.extend((passed + 1..=total).map(TestCaseResult::failed));
    } else if output.contains("OK") {
        results.extend((1..=total).map(TestCaseResult::passed));
    }

    if results.is_empty() {
        results.push(TestCaseResult::execution_failure("No test results available"));
    }
    results
}
