use std::io::Write;
use std::process::Stdio;
use std::time::{Duration, Instant};

use common::config::AppConfig;
use serde::Deserialize;
use serde_json::json;

use crate::results::{parse_unittest_output, ExecutionResult, TestCaseResult};

/// Reply of the remote sandbox's `/execute` endpoint.
#[derive(Debug, Deserialize)]
struct RemoteReply {
    success: bool,
    output: Option<String>,
    error: Option<String>,
    #[allow(dead_code)]
    return_code: Option<i32>,
}

#[derive(Clone)]
enum Backend {
    Local { python_bin: String },
    Remote { url: String, http: reqwest::Client },
}

/// Runs Python snippets either through a local interpreter or a remote
/// sandbox service.
#[derive(Clone)]
pub struct Executor {
    backend: Backend,
    exec_timeout: u64,
    test_timeout: u64,
}

/// Captured outcome of one run, before interpretation.
struct RawRun {
    success: bool,
    stdout: String,
    stderr: String,
    elapsed: f64,
}

enum RunError {
    Timeout,
    Other(anyhow::Error),
}

impl std::fmt::Display for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::Local { python_bin } => write!(f, "local {}", python_bin),
            Backend::Remote { url, .. } => write!(f, "sandbox {}", url),
        }
    }
}

impl Executor {
    pub fn from_config(config: &AppConfig, http: &reqwest::Client) -> Self {
        let backend = match config.sandbox_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Backend::Remote {
                url: url.trim_end_matches('/').to_string(),
                http: http.clone(),
            },
            None => Backend::Local {
                python_bin: config.python_bin.clone(),
            },
        };
        Self {
            backend,
            exec_timeout: config.exec_timeout_secs,
            test_timeout: config.test_timeout_secs,
        }
    }

    async fn run(&self, code: &str, timeout_secs: u64) -> Result<RawRun, RunError> {
        match &self.backend {
            Backend::Local { python_bin } => run_local(python_bin, code, timeout_secs).await,
            Backend::Remote { url, http } => run_remote(http, url, code, timeout_secs)
                .await
                .map_err(RunError::Other),
        }
    }

    /// Execute `code` and report its output. Failures are reported in the
    /// result, never as an `Err`.
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        let started = Instant::now();
        match self.run(code, self.exec_timeout).await {
            Ok(run) => ExecutionResult {
                success: run.success,
                output: run.stdout,
                error: Some(run.stderr).filter(|s| !s.is_empty()),
                execution_time: run.elapsed,
                memory_usage: 0.0,
                cpu_usage: 0.0,
                test_results: Vec::new(),
            },
            Err(RunError::Timeout) => ExecutionResult::failure(
                format!("Execution timeout ({} seconds)", self.exec_timeout),
                started.elapsed().as_secs_f64(),
            ),
            Err(RunError::Other(e)) => {
                log::warn!("code execution failed: {}", e);
                ExecutionResult::failure(e.to_string(), started.elapsed().as_secs_f64())
            }
        }
    }

    /// Run a script containing `unittest` cases and parse its summary.
    pub async fn run_tests(&self, test_script: &str) -> Vec<TestCaseResult> {
        match self.run(test_script, self.test_timeout).await {
            Ok(run) => parse_unittest_output(&format!("{}{}", run.stdout, run.stderr)),
            Err(RunError::Timeout) => vec![TestCaseResult::execution_failure(format!(
                "Test execution timed out ({} seconds)",
                self.test_timeout
            ))],
            Err(RunError::Other(e)) => vec![TestCaseResult::execution_failure(e.to_string())],
        }
    }
}

async fn run_local(python_bin: &str, code: &str, timeout_secs: u64) -> Result<RawRun, RunError> {
    let mut script = tempfile::Builder::new()
        .prefix("playground_")
        .suffix(".py")
        .tempfile()
        .map_err(|e| RunError::Other(e.into()))?;
    script
        .write_all(code.as_bytes())
        .and_then(|_| script.flush())
        .map_err(|e| RunError::Other(e.into()))?;

    let started = Instant::now();
    let child = tokio::process::Command::new(python_bin)
        .arg(script.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RunError::Other(anyhow::anyhow!("failed to start {}: {}", python_bin, e)))?;

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
        .await
        .map_err(|_| RunError::Timeout)?
        .map_err(|e| RunError::Other(e.into()))?;

    Ok(RawRun {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed: started.elapsed().as_secs_f64(),
    })
}

async fn run_remote(
    http: &reqwest::Client,
    url: &str,
    code: &str,
    timeout_secs: u64,
) -> anyhow::Result<RawRun> {
    let endpoint = format!("{}/execute", url);
    log::info!("sandbox POST {}", endpoint);
    let started = Instant::now();
    let body = serde_json::to_vec(&json!({ "code": code, "timeout": timeout_secs }))?;
    let resp = http
        .post(&endpoint)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .timeout(Duration::from_secs(timeout_secs + 5))
        .send()
        .await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        anyhow::bail!(
            "sandbox returned {}: {}",
            status.as_u16(),
            String::from_utf8_lossy(&bytes)
        );
    }
    let reply: RemoteReply = serde_json::from_slice(&bytes)?;
    Ok(RawRun {
        success: reply.success,
        stdout: reply.output.unwrap_or_default(),
        stderr: reply.error.unwrap_or_default(),
        elapsed: started.elapsed().as_secs_f64(),
    })
}
