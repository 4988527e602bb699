//! Shell 命令步骤
//!
//! 顺序执行命令序列，执行通过 sh -c / cmd /C，带超时；stdout/stderr 拼接为文本输出。
//! handle_error = false 时失败向调用方传播而非只记录为失败 Observation。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::{EngineError, Observation, Step};
use crate::fsedit::ensure_absolute_path;
use crate::sdk::Sdk;

/// Shell 步骤：命令序列 + 可选 cwd + 超时
pub struct ShellCommandsStep {
    cmds: Vec<String>,
    cwd: Option<PathBuf>,
    name: Option<String>,
    description: Option<String>,
    handle_error: bool,
    timeout_secs: u64,
}

impl ShellCommandsStep {
    pub fn new(cmds: Vec<String>) -> Self {
        Self {
            cmds,
            cwd: None,
            name: None,
            description: None,
            handle_error: true,
            timeout_secs: 30,
        }
    }

    /// cwd 为相对路径时按工作区根解析
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_handle_error(mut self, handle_error: bool) -> Self {
        self.handle_error = handle_error;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[async_trait]
impl Step for ShellCommandsStep {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| Some(format!("`{}`", self.cmds.join(" && "))))
    }

    fn handle_error(&self) -> bool {
        self.handle_error
    }

    async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
        let workspace = sdk.host().workspace_directory().await?;
        let cwd = match &self.cwd {
            Some(cwd) => ensure_absolute_path(cwd, &workspace),
            None => workspace,
        };

        let mut output = String::new();
        for raw in &self.cmds {
            tracing::info!(command = %raw, cwd = %cwd.display(), "shell step execute");

            let mut cmd = if cfg!(target_os = "windows") {
                let mut c = Command::new("cmd");
                c.args(["/C", raw]);
                c
            } else {
                let mut c = Command::new("sh");
                c.args(["-c", raw]);
                c
            };
            cmd.current_dir(&cwd);

            let out = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
                .await
                .map_err(|_| {
                    EngineError::StepFailed(format!(
                        "Command timed out after {}s: {}",
                        self.timeout_secs, raw
                    ))
                })?
                .map_err(|e| EngineError::StepFailed(format!("Execution failed: {}", e)))?;

            let stdout = String::from_utf8_lossy(&out.stdout).to_string();
            let stderr = String::from_utf8_lossy(&out.stderr).to_string();
            if !out.status.success() {
                return Err(EngineError::StepFailed(format!(
                    "Command `{}` exited with {:?}\nstderr: {}",
                    raw,
                    out.status.code(),
                    stderr.trim()
                )));
            }
            output.push_str(&stdout);
            if !stderr.is_empty() {
                output.push_str(&format!("\nstderr: {}", stderr.trim()));
            }
        }

        Ok(Observation::Text { text: output })
    }
}
