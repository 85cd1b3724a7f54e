pub mod compose;

pub use compose::ComposeCli;

use async_trait::async_trait;
use std::path::Path;

use crate::core::EnvResult;

/// Name of the definition file inside every environment directory.
pub const DEFINITION_FILE: &str = "docker-compose.yml";

/// Contract of the container orchestration layer.
///
/// `project` is the environment directory holding the definition. Every
/// method maps a non-zero exit to `EnvError::OrchestrationFailure`.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Bring the service graph up in detached mode.
    async fn up(&self, project: &Path) -> EnvResult<()>;

    /// Halt the services without removing containers.
    async fn stop(&self, project: &Path) -> EnvResult<()>;

    /// Tear the service graph down, including its named volumes.
    async fn down(&self, project: &Path) -> EnvResult<()>;

    /// Run a command non-interactively inside a service and return stdout.
    async fn exec(&self, project: &Path, service: &str, command: &[String]) -> EnvResult<String>;

    /// Names of the services currently running.
    async fn running_services(&self, project: &Path) -> EnvResult<Vec<String>>;
}
