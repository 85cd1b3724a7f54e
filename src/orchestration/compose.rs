use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Orchestrator, DEFINITION_FILE};
use crate::core::{EnvError, EnvResult, Settings};

/// Orchestrator backed by the compose command line tool.
///
/// Commands run with the environment directory as working directory, so the
/// compose project name is the environment slug.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl ComposeCli {
    pub fn new(program: impl Into<String>, base_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args,
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (program, base_args) = settings.compose_program()?;
        Ok(Self::new(program, base_args, settings.command_timeout()))
    }

    /// Whether the compose program can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self, project: &Path, args: &[String]) -> EnvResult<String> {
        let action = self.describe(args);
        debug!(command = %action, cwd = %project.display(), "Running compose command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("-f")
            .arg(DEFINITION_FILE)
            .args(args)
            .current_dir(project)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(command = %action, error = %e, "Failed to launch compose command");
                return Err(EnvError::OrchestrationFailure {
                    action,
                    code: None,
                    stderr: format!("failed to launch '{}': {}", self.program, e),
                });
            }
            Err(_) => {
                warn!(command = %action, timeout_secs = self.timeout.as_secs(), "Compose command timed out");
                return Err(EnvError::OrchestrationFailure {
                    action,
                    code: None,
                    stderr: format!("timed out after {}s", self.timeout.as_secs_f32()),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command = %action, code = ?output.status.code(), "Compose command failed");
            return Err(EnvError::OrchestrationFailure {
                action,
                code: output.status.code(),
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(stdout)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl Orchestrator for ComposeCli {
    async fn up(&self, project: &Path) -> EnvResult<()> {
        self.run(project, &args(&["up", "-d"])).await.map(|_| ())
    }

    async fn stop(&self, project: &Path) -> EnvResult<()> {
        self.run(project, &args(&["stop"])).await.map(|_| ())
    }

    async fn down(&self, project: &Path) -> EnvResult<()> {
        self.run(project, &args(&["down", "-v"])).await.map(|_| ())
    }

    async fn exec(&self, project: &Path, service: &str, command: &[String]) -> EnvResult<String> {
        let mut full = args(&["exec", "-T", service]);
        full.extend(command.iter().cloned());
        self.run(project, &full).await
    }

    async fn running_services(&self, project: &Path) -> EnvResult<Vec<String>> {
        let out = self
            .run(project, &args(&["ps", "--services", "--filter", "status=running"]))
            .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
