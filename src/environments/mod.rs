use anyhow::Context;
use futures::stream::{self, StreamExt};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod locks;
pub mod options;

pub use locks::SlugLocks;
pub use options::{port_from_value, validate_port, CreateOptions, ModifyOptions, MODIFY_OPTIONS};

use crate::core::{
    slugify, EnvError, EnvResult, EnvironmentKind, EnvironmentMetadata, EnvironmentSummary,
    Report, RuntimeState, Settings,
};
use crate::orchestration::{ComposeCli, Orchestrator};
use crate::plugins::{install_plugins, PluginReport};
use crate::storage::{EnvironmentStore, FsStore};
use crate::templates::{set_published_port, EnvironmentTemplate};

pub const NO_ENVIRONMENTS: &str = "No environments found.";

/// Upper bound on state queries running at once while listing.
pub const STATE_QUERY_CONCURRENCY: usize = 8;

/// Creates, starts, stops, modifies, lists and deletes environments.
///
/// Every operation keys environments by the slug of the name it is given.
/// Mutating operations hold the slug's lock for their whole duration; state
/// is always re-read from the store and the orchestrator.
pub struct EnvironmentManager {
    store: Arc<dyn EnvironmentStore>,
    orchestrator: Arc<dyn Orchestrator>,
    locks: SlugLocks,
}

impl EnvironmentManager {
    pub fn new(store: Arc<dyn EnvironmentStore>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            locks: SlugLocks::new(),
        }
    }

    /// Build the manager over the configured root directory and compose CLI.
    ///
    /// An unusable root directory is the one fatal condition.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = FsStore::open(&settings.env_dir).await.with_context(|| {
            format!(
                "Environment directory {} is not usable",
                settings.env_dir.display()
            )
        })?;
        let orchestrator = ComposeCli::from_settings(settings)?;
        Ok(Self::new(Arc::new(store), Arc::new(orchestrator)))
    }

    pub async fn create(
        &self,
        name: &str,
        kind: &str,
        port: u16,
        options: &str,
    ) -> EnvResult<Report> {
        crate::track_performance!("create_environment");
        let kind = EnvironmentKind::parse(kind)?;
        let port = validate_port(port.into())?;
        let options = CreateOptions::parse(options)?;
        let slug = slug_for(name)?;

        let template = EnvironmentTemplate::for_kind(kind);
        let definition = template
            .render(port)
            .to_yaml()
            .map_err(|e| EnvError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        let _guard = self.locks.acquire(&slug).await;
        info!(slug = %slug, kind = %kind, port, "Creating environment");

        match self.store.create_dir(&slug).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(EnvError::AlreadyExists {
                    name: name.to_string(),
                    slug,
                })
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.store.write_definition(&slug, &definition).await {
            if let Err(cleanup) = self.store.remove(&slug).await {
                warn!(slug = %slug, error = %cleanup, "Could not remove half-created environment");
            }
            return Err(e.into());
        }

        let mut warnings = Vec::new();
        let metadata = EnvironmentMetadata::new(name, kind, port);
        if let Err(e) = self.store.write_metadata(&slug, &metadata).await {
            warn!(slug = %slug, error = %e, "Metadata could not be saved");
            warnings.push(format!("metadata could not be saved: {}", e));
        }

        let project = self.store.project_dir(&slug);
        if let Err(e) = self.orchestrator.up(&project).await {
            warn!(slug = %slug, "Environment definition kept after failed start; retry with start");
            return Err(e);
        }

        let mut report = Report::new(format!(
            "Environment '{}' created and started on port {} (slug: {}).",
            name, port, slug
        ))
        .with_warnings(warnings);

        if !options.plugins.is_empty() {
            let plugins = install_plugins(
                self.orchestrator.as_ref(),
                &project,
                &template,
                &options.plugins,
            )
            .await;
            if let Some(summary) = plugin_summary(&plugins) {
                report.message.push(' ');
                report.message.push_str(&summary);
            }
            report.warnings.extend(plugins.warnings());
        }

        info!(slug = %slug, warnings = report.warnings.len(), "Environment created");
        Ok(report)
    }

    pub async fn delete(&self, name: &str) -> EnvResult<Report> {
        crate::track_performance!("delete_environment");
        let slug = slug_for(name)?;
        let _guard = self.locks.acquire(&slug).await;

        if !self.store.exists(&slug).await {
            return Err(not_found(name, slug));
        }

        let had_definition = self.store.has_definition(&slug).await;
        if had_definition {
            info!(slug = %slug, "Tearing down environment");
            self.orchestrator.down(&self.store.project_dir(&slug)).await?;
        } else {
            debug!(slug = %slug, "No definition; nothing to tear down");
        }

        if let Err(e) = self.store.remove(&slug).await {
            warn!(slug = %slug, error = %e, "Directory cleanup failed");
            return Err(if had_definition {
                EnvError::PartialCleanupFailure {
                    slug,
                    reason: e.to_string(),
                }
            } else {
                e.into()
            });
        }

        info!(slug = %slug, "Environment deleted");
        Ok(Report::new(format!("Environment '{}' deleted.", name)))
    }

    pub async fn stop(&self, name: &str) -> EnvResult<Report> {
        crate::track_performance!("stop_environment");
        let slug = slug_for(name)?;
        let _guard = self.locks.acquire(&slug).await;
        let project = self.require_definition(name, &slug).await?;

        self.orchestrator.stop(&project).await?;
        info!(slug = %slug, "Environment stopped");
        Ok(Report::new(format!("Environment '{}' stopped.", name)))
    }

    pub async fn start(&self, name: &str) -> EnvResult<Report> {
        crate::track_performance!("start_environment");
        let slug = slug_for(name)?;
        let _guard = self.locks.acquire(&slug).await;
        let project = self.require_definition(name, &slug).await?;

        self.orchestrator.up(&project).await?;
        info!(slug = %slug, "Environment started");
        Ok(Report::new(format!("Environment '{}' started.", name)))
    }

    /// Apply every recognised option present: `port` first, then `plugins`.
    pub async fn modify(&self, name: &str, options: &str) -> EnvResult<Report> {
        crate::track_performance!("modify_environment");
        let slug = slug_for(name)?;
        let _guard = self.locks.acquire(&slug).await;
        let project = self.require_definition(name, &slug).await?;

        let options = ModifyOptions::parse(options)?;
        if options.is_empty() {
            return Err(EnvError::Unsupported {
                supported: MODIFY_OPTIONS.to_vec(),
            });
        }

        let metadata = self.store.read_metadata(&slug).await;
        let template = template_for(metadata.as_ref());
        let mut report = Report::default();
        let mut messages = Vec::new();

        if let Some(port) = options.port {
            let raw = self
                .store
                .read_definition(&slug)
                .await?
                .ok_or_else(|| not_found(name, slug.clone()))?;
            let malformed = |reason: String| EnvError::MalformedDefinition {
                slug: slug.clone(),
                reason,
            };

            let mut doc: serde_yaml::Value =
                serde_yaml::from_str(&raw).map_err(|e| malformed(e.to_string()))?;
            let edit = set_published_port(
                &mut doc,
                template.primary_service,
                template.primary_container_port,
                port,
            )
            .map_err(malformed)?;

            if edit.changed {
                let yaml = serde_yaml::to_string(&doc).map_err(|e| malformed(e.to_string()))?;
                self.store.write_definition(&slug, &yaml).await?;
            }

            if let Some(mut metadata) = metadata.clone() {
                if metadata.port != Some(port) {
                    metadata.port = Some(port);
                    if let Err(e) = self.store.write_metadata(&slug, &metadata).await {
                        warn!(slug = %slug, error = %e, "Metadata could not be updated");
                        report.warn(format!("metadata could not be updated: {}", e));
                    }
                }
            }

            self.orchestrator.up(&project).await?;
            info!(slug = %slug, port, changed = edit.changed, "Port applied");
            messages.push(match (edit.changed, edit.previous) {
                (true, Some(previous)) => format!(
                    "Port of '{}' changed from {} to {} and the environment was restarted.",
                    name, previous, port
                ),
                (true, None) => format!(
                    "Port of '{}' set to {} and the environment was restarted.",
                    name, port
                ),
                (false, _) => format!(
                    "Port of '{}' is already {}; the environment was re-applied.",
                    name, port
                ),
            });
        }

        if let Some(plugins) = options.plugins.filter(|p| !p.is_empty()) {
            let outcome =
                install_plugins(self.orchestrator.as_ref(), &project, &template, &plugins).await;
            messages.push(format!("Plugin installation attempted in '{}'.", name));
            messages.extend(plugin_summary(&outcome));
            report.warnings.extend(outcome.warnings());
        }

        report.message = messages.join(" ");
        Ok(report)
    }

    /// Runtime state of one environment, derived from the orchestrator.
    pub async fn runtime_state(&self, slug: &str) -> RuntimeState {
        if !self.store.has_definition(slug).await {
            return RuntimeState::Absent;
        }
        match self
            .orchestrator
            .running_services(&self.store.project_dir(slug))
            .await
        {
            Ok(services) if services.is_empty() => RuntimeState::Stopped,
            Ok(_) => RuntimeState::Running,
            Err(e) => {
                debug!(slug, error = %e, "State query failed");
                RuntimeState::Unknown
            }
        }
    }

    /// Summaries of every environment directory, sorted by slug.
    pub async fn summaries(&self) -> EnvResult<Vec<EnvironmentSummary>> {
        let slugs = self.store.list_slugs().await?;
        Ok(stream::iter(slugs)
            .map(|slug| self.summarize(slug))
            .buffered(STATE_QUERY_CONCURRENCY)
            .collect()
            .await)
    }

    async fn summarize(&self, slug: String) -> EnvironmentSummary {
        let metadata = self.store.read_metadata(&slug).await;
        let has_definition = self.store.has_definition(&slug).await;
        let state = if has_definition {
            self.runtime_state(&slug).await
        } else {
            RuntimeState::Absent
        };

        let (display_name, kind, port) = match metadata {
            Some(m) => (m.display_name, Some(m.kind).filter(|k| !k.is_empty()), m.port),
            None => (slug.clone(), None, None),
        };

        EnvironmentSummary {
            slug,
            display_name,
            kind,
            port,
            has_definition,
            state,
        }
    }

    /// Report of every environment directory, including ones without a definition.
    pub async fn list_all(&self) -> EnvResult<Report> {
        let summaries = self.summaries().await?;
        if summaries.is_empty() {
            return Ok(Report::new(NO_ENVIRONMENTS));
        }

        let mut out = String::from("All environments:");
        for s in &summaries {
            out.push_str(&format!(
                "\n- {} (slug: {}) - port: {}, definition: {}, state: {}",
                s.display_name,
                s.slug,
                port_label(s.port),
                if s.has_definition { "yes" } else { "no" },
                s.state
            ));
        }
        Ok(Report::new(out))
    }

    /// Report of the environments that have a definition.
    pub async fn list_scoped(&self) -> EnvResult<Report> {
        let summaries: Vec<_> = self
            .summaries()
            .await?
            .into_iter()
            .filter(|s| s.has_definition)
            .collect();
        if summaries.is_empty() {
            return Ok(Report::new(NO_ENVIRONMENTS));
        }

        let mut out = String::from("Environments and state:");
        for s in &summaries {
            out.push_str(&format!("\n- {} (slug: {}): {}", s.display_name, s.slug, s.state));
        }
        Ok(Report::new(out))
    }

    /// Details of a single environment.
    pub async fn inspect(&self, name: &str) -> EnvResult<Report> {
        let slug = slug_for(name)?;
        if !self.store.exists(&slug).await {
            return Err(not_found(name, slug));
        }

        let summary = self.summarize(slug).await;
        let mut out = format!(
            "Environment '{}' (slug: {})\n  type: {}\n  port: {}\n  definition: {}\n  state: {}",
            summary.display_name,
            summary.slug,
            summary.kind.as_deref().unwrap_or("unknown"),
            port_label(summary.port),
            if summary.has_definition { "yes" } else { "no" },
            summary.state
        );

        if let Some(raw) = self.store.read_definition(&summary.slug).await? {
            match serde_yaml::from_str::<serde_yaml::Value>(&raw) {
                Ok(doc) => {
                    let services: Vec<String> = doc
                        .get("services")
                        .and_then(serde_yaml::Value::as_mapping)
                        .map(|m| m.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
                        .unwrap_or_default();
                    out.push_str(&format!("\n  services: {}", services.join(", ")));
                }
                Err(e) => out.push_str(&format!("\n  services: unreadable definition ({})", e)),
            }
        }

        Ok(Report::new(out))
    }

    /// Directory of an environment that has a definition.
    async fn require_definition(&self, name: &str, slug: &str) -> EnvResult<PathBuf> {
        if !self.store.has_definition(slug).await {
            return Err(not_found(name, slug.to_string()));
        }
        Ok(self.store.project_dir(slug))
    }
}

fn slug_for(name: &str) -> EnvResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(EnvError::invalid(format!(
            "name '{}' contains no usable characters",
            name
        )));
    }
    Ok(slug)
}

fn not_found(name: &str, slug: String) -> EnvError {
    EnvError::NotFound {
        name: name.to_string(),
        slug,
    }
}

fn port_label(port: Option<u16>) -> String {
    port.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Template of an existing environment; records of unknown kind fall back to
/// WordPress, the only kind ever generated.
fn template_for(metadata: Option<&EnvironmentMetadata>) -> EnvironmentTemplate {
    let kind = metadata
        .and_then(|m| EnvironmentKind::parse(&m.kind).ok())
        .unwrap_or(EnvironmentKind::Wordpress);
    EnvironmentTemplate::for_kind(kind)
}

fn plugin_summary(plugins: &PluginReport) -> Option<String> {
    if plugins.installed.is_empty() {
        return None;
    }
    let names: Vec<&str> = plugins.installed.iter().map(|(p, _)| p.as_str()).collect();
    Some(format!("Plugins installed: {}.", names.join(", ")))
}
