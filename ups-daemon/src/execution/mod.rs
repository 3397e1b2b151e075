//! Action script execution
//!
//! Runs the configured command for each power action:
//! - Command strings split with shell quoting rules, no shell involved
//! - Bounded by the script timeout, child killed on expiry
//! - stdout/stderr captured for the log
//! - Never retried

use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info};
use ups_kernel::{Action, ActionError, ActionSink};

use crate::config::ScriptConfig;

/// Outcome of one script run
#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u128,
}

/// Action sink backed by external commands
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    scripts: ScriptConfig,
}

impl ScriptExecutor {
    pub fn new(scripts: ScriptConfig) -> Self {
        Self { scripts }
    }

    /// Run one action's command and capture its output.
    pub async fn execute(&self, action: Action) -> Result<ExecutionResult, ActionError> {
        let command = self
            .scripts
            .command(action)
            .ok_or(ActionError::NotConfigured(action))?;
        let start_time = Instant::now();
        info!(%action, command, "Executing action command");

        let (output, exit_code) =
            Self::execute_command(action, command, self.scripts.timeout()).await?;
        let execution_time_ms = start_time.elapsed().as_millis();

        let result = ExecutionResult {
            success: exit_code == Some(0),
            output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            error: Some(String::from_utf8_lossy(&output.stderr).trim().to_string())
                .filter(|s| !s.is_empty()),
            exit_code,
            execution_time_ms,
        };
        debug!(%action, ?result, "Action command finished");
        Ok(result)
    }

    async fn execute_command(
        action: Action,
        command: &str,
        timeout: Duration,
    ) -> Result<(std::process::Output, Option<i32>), ActionError> {
        let argv = shell_words::split(command).map_err(|e| ActionError::Spawn {
            action,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        let Some((program, args)) = argv.split_first() else {
            return Err(ActionError::NotConfigured(action));
        };

        let output = tokio::time::timeout(
            timeout,
            AsyncCommand::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ActionError::Timeout { action, after: timeout })?
        .map_err(|source| ActionError::Spawn { action, source })?;

        let code = output.status.code();
        Ok((output, code))
    }
}

#[async_trait]
impl ActionSink for ScriptExecutor {
    async fn trigger(&self, action: Action) -> Result<(), ActionError> {
        let result = self.execute(action).await?;
        if result.success {
            info!(
                %action,
                elapsed_ms = result.execution_time_ms as u64,
                output = %result.output,
                "Action command succeeded"
            );
            Ok(())
        } else {
            error!(%action, exit_code = ?result.exit_code, "Action command failed");
            Err(ActionError::Failed {
                action,
                code: result.exit_code,
                stderr: result.error.unwrap_or_default(),
            })
        }
    }
}
