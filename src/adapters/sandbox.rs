//! Local execution of agent code in a child process.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SandboxConfig;
use crate::domain::ports::{SandboxExecutor, SandboxOutcome};

/// Pipes agent code into the configured interpreter's stdin.
///
/// The child is killed when the run exceeds the timeout. Only a failure to
/// start the interpreter is an `Err`; a crash, non-zero exit or timeout is
/// reported as an unsuccessful outcome.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    interpreter: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessSandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

#[async_trait]
impl SandboxExecutor for ProcessSandbox {
    #[instrument(skip_all, fields(interpreter = %self.interpreter))]
    async fn execute_sandboxed(&self, agent_code: &str) -> DomainResult<SandboxOutcome> {
        let started = Instant::now();
        let mut child = Command::new(&self.interpreter)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::ExecutionFailed(format!("Failed to start {}: {e}", self.interpreter))
            })?;

        // The stdin write runs under the timeout too; a child that stops
        // reading leaves it blocked on a full pipe.
        let run = async move {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(err) = stdin.write_all(agent_code.as_bytes()).await {
                    debug!(error = %err, "Interpreter closed stdin early");
                }
            }
            child.wait_with_output().await
        };

        let waited = tokio::time::timeout(self.timeout, run).await;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(DomainError::ExecutionFailed(format!(
                    "Failed to collect sandbox output: {err}"
                )))
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Sandbox run timed out");
                return Ok(SandboxOutcome {
                    output: String::new(),
                    success: false,
                    execution_time_ms: elapsed,
                    error: Some(format!("timed out after {}s", self.timeout.as_secs())),
                });
            }
        };

        let stdout = truncate(&String::from_utf8_lossy(&output.stdout), self.max_output_bytes);
        let success = output.status.success();
        let error = (!success).then(|| {
            let stderr = truncate(&String::from_utf8_lossy(&output.stderr), self.max_output_bytes);
            if stderr.trim().is_empty() {
                format!("interpreter exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            }
        });

        Ok(SandboxOutcome {
            output: stdout.trim_end().to_string(),
            success,
            execution_time_ms: elapsed,
            error,
        })
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary.
fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sandbox(timeout_secs: u64, max_output_bytes: usize) -> ProcessSandbox {
        ProcessSandbox::new(&SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_secs,
            max_output_bytes,
        })
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let outcome = sandbox(5, 1024).execute_sandboxed("echo hello").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output, "hello");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_unsuccessful() {
        let outcome = sandbox(5, 1024)
            .execute_sandboxed("echo broken >&2; exit 3")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("broken"));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_child() {
        let outcome = sandbox(1, 1024).execute_sandboxed("sleep 10").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
        assert!(outcome.execution_time_ms < 10_000);
    }

    #[tokio::test]
    async fn test_timeout_covers_a_child_that_stops_reading_stdin() {
        // The shell blocks in `sleep` long before the pipe drains.
        let code = format!("sleep 10\n#{}\n", "x".repeat(1 << 20));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            sandbox(1, 1024).execute_sandboxed(&code),
        )
        .await
        .expect("sandbox timeout should fire while stdin is still being written")
        .unwrap();

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let outcome = sandbox(5, 4).execute_sandboxed("printf abcdefghij").await.unwrap();
        assert_eq!(outcome.output, "abcd");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_an_error() {
        let sandbox = ProcessSandbox::new(&SandboxConfig {
            interpreter: "/nonexistent/interpreter".to_string(),
            ..SandboxConfig::default()
        });
        assert!(matches!(
            sandbox.execute_sandboxed("print(1)").await,
            Err(DomainError::ExecutionFailed(_))
        ));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 10), "short");
    }
}
