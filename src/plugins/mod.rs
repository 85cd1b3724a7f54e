use std::future::Future;
use std::path::Path;
use tracing::{info, warn};

use crate::core::{EnvError, EnvResult};
use crate::orchestration::Orchestrator;
use crate::templates::EnvironmentTemplate;

/// Try each candidate in order and return the first success.
///
/// Failures are collected and only surface when every candidate failed.
pub async fn first_success<'c, T, F, Fut>(
    candidates: &[&'c str],
    mut attempt: F,
) -> Result<(&'c str, T), Vec<(&'c str, EnvError)>>
where
    F: FnMut(&'c str) -> Fut,
    Fut: Future<Output = EnvResult<T>>,
{
    let mut failures = Vec::new();
    for &candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => failures.push((candidate, e)),
        }
    }
    Err(failures)
}

/// Outcome of a best-effort installation pass.
#[derive(Debug, Default)]
pub struct PluginReport {
    /// Plugin and the service it was installed through.
    pub installed: Vec<(String, String)>,
    /// Plugin and a description of every failed attempt.
    pub skipped: Vec<(String, String)>,
}

impl PluginReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// One warning per skipped plugin, asking for manual follow-up.
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|(plugin, reason)| {
                format!(
                    "plugin '{}' could not be installed and may need manual installation ({})",
                    plugin, reason
                )
            })
            .collect()
    }
}

/// Install `plugins` one by one through the template's plugin-capable
/// services. A plugin that fails everywhere is skipped, never fatal.
pub async fn install_plugins(
    orchestrator: &dyn Orchestrator,
    project: &Path,
    template: &EnvironmentTemplate,
    plugins: &[String],
) -> PluginReport {
    let mut report = PluginReport::default();

    for plugin in plugins {
        let command = template.plugin_install_command(plugin);
        let attempt = first_success(template.plugin_services, |service| {
            let command = &command;
            async move { orchestrator.exec(project, service, command).await }
        })
        .await;

        match attempt {
            Ok((service, _)) => {
                info!(plugin = %plugin, service, "Plugin installed");
                report.installed.push((plugin.clone(), service.to_string()));
            }
            Err(failures) => {
                let reason = failures
                    .iter()
                    .map(|(service, e)| format!("{}: {}", service, e))
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(plugin = %plugin, reason = %reason, "Plugin installation skipped");
                report.skipped.push((plugin.clone(), reason));
            }
        }
    }

    report
}
