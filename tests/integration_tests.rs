use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use stackctl::{
    core::{EnvError, EnvResult, EnvironmentMetadata},
    environments::{EnvironmentManager, NO_ENVIRONMENTS, STATE_QUERY_CONCURRENCY},
    orchestration::{Orchestrator, DEFINITION_FILE},
    storage::{EnvironmentStore, FsStore, METADATA_FILE},
    tools::dispatch,
};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// In-memory stand-in for the compose tool.
#[derive(Default)]
struct FakeState {
    running: HashSet<PathBuf>,
    calls: Vec<String>,
    fail_up: bool,
    fail_down: bool,
    fail_ps: bool,
    failing_exec: HashSet<String>,
    up_delay: Option<Duration>,
    ps_delay: Option<Duration>,
    ps_in_flight: usize,
    ps_peak: usize,
}

#[derive(Default)]
struct FakeOrchestrator {
    state: Mutex<FakeState>,
}

fn project_name(project: &Path) -> String {
    project
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn failure(action: &str) -> EnvError {
    EnvError::OrchestrationFailure {
        action: action.to_string(),
        code: Some(1),
        stderr: "simulated failure".to_string(),
    }
}

impl FakeOrchestrator {
    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn up(&self, project: &Path) -> EnvResult<()> {
        let delay = self.with(|s| s.up_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            s.calls.push(format!("up {}", project_name(project)));
            if s.fail_up {
                return Err(failure("up"));
            }
            s.running.insert(project.to_path_buf());
            Ok(())
        })
    }

    async fn stop(&self, project: &Path) -> EnvResult<()> {
        self.with(|s| {
            s.calls.push(format!("stop {}", project_name(project)));
            s.running.remove(project);
            Ok(())
        })
    }

    async fn down(&self, project: &Path) -> EnvResult<()> {
        self.with(|s| {
            s.calls.push(format!("down {}", project_name(project)));
            if s.fail_down {
                return Err(failure("down"));
            }
            s.running.remove(project);
            Ok(())
        })
    }

    async fn exec(&self, project: &Path, service: &str, command: &[String]) -> EnvResult<String> {
        self.with(|s| {
            s.calls.push(format!(
                "exec {} {} {}",
                project_name(project),
                service,
                command.join(" ")
            ));
            if s.failing_exec.contains(service) {
                Err(failure("exec"))
            } else {
                Ok(String::new())
            }
        })
    }

    async fn running_services(&self, project: &Path) -> EnvResult<Vec<String>> {
        let delay = self.with(|s| {
            s.ps_in_flight += 1;
            s.ps_peak = s.ps_peak.max(s.ps_in_flight);
            s.ps_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            s.ps_in_flight -= 1;
            if s.fail_ps {
                return Err(failure("ps"));
            }
            Ok(if s.running.contains(project) {
                vec!["db".to_string(), "wordpress".to_string(), "wpcli".to_string()]
            } else {
                Vec::new()
            })
        })
    }
}

/// Storage faults to inject into [`FaultyStore`].
#[derive(Default, Clone, Copy)]
struct Faults {
    remove: bool,
    write_definition: bool,
    write_metadata: bool,
}

/// Filesystem store that fails the selected writes.
struct FaultyStore {
    inner: FsStore,
    faults: Faults,
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{} is busy", what))
}

#[async_trait]
impl EnvironmentStore for FaultyStore {
    fn project_dir(&self, slug: &str) -> PathBuf {
        self.inner.project_dir(slug)
    }

    async fn list_slugs(&self) -> io::Result<Vec<String>> {
        self.inner.list_slugs().await
    }

    async fn exists(&self, slug: &str) -> bool {
        self.inner.exists(slug).await
    }

    async fn create_dir(&self, slug: &str) -> io::Result<()> {
        self.inner.create_dir(slug).await
    }

    async fn read_definition(&self, slug: &str) -> io::Result<Option<String>> {
        self.inner.read_definition(slug).await
    }

    async fn write_definition(&self, slug: &str, contents: &str) -> io::Result<()> {
        if self.faults.write_definition {
            return Err(injected("definition"));
        }
        self.inner.write_definition(slug, contents).await
    }

    async fn read_metadata(&self, slug: &str) -> Option<EnvironmentMetadata> {
        self.inner.read_metadata(slug).await
    }

    async fn write_metadata(&self, slug: &str, metadata: &EnvironmentMetadata) -> io::Result<()> {
        if self.faults.write_metadata {
            return Err(injected("metadata"));
        }
        self.inner.write_metadata(slug, metadata).await
    }

    async fn remove(&self, slug: &str) -> io::Result<()> {
        if self.faults.remove {
            return Err(injected("directory"));
        }
        self.inner.remove(slug).await
    }
}

/// Manager over a [`FaultyStore`] rooted at `root`.
async fn faulty_manager(
    root: &Path,
    faults: Faults,
) -> Result<(EnvironmentManager, Arc<FakeOrchestrator>)> {
    let store = FaultyStore {
        inner: FsStore::open(root).await?,
        faults,
    };
    let fake = Arc::new(FakeOrchestrator::default());
    Ok((EnvironmentManager::new(Arc::new(store), fake.clone()), fake))
}

struct Harness {
    _temp: TempDir,
    root: PathBuf,
    manager: Arc<EnvironmentManager>,
    fake: Arc<FakeOrchestrator>,
}

impl Harness {
    async fn new() -> Result<Self> {
        let temp = tempdir()?;
        let root = temp.path().join("environments");
        let store = FsStore::open(&root).await?;
        let fake = Arc::new(FakeOrchestrator::default());
        let manager = EnvironmentManager::new(Arc::new(store), fake.clone());
        Ok(Self {
            _temp: temp,
            root,
            manager: Arc::new(manager),
            fake,
        })
    }

    fn definition(&self, slug: &str) -> String {
        std::fs::read_to_string(self.root.join(slug).join(DEFINITION_FILE)).unwrap()
    }
}

mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::test;

    #[test]
    async fn create_then_list_all_shows_the_environment() -> Result<()> {
        let h = Harness::new().await?;

        let report = h.manager.create("My Site", "wordpress", 8080, "{}").await?;
        assert_eq!(
            report.message,
            "Environment 'My Site' created and started on port 8080 (slug: my_site)."
        );
        assert!(report.is_clean());

        assert!(h.definition("my_site").contains("8080:80"));
        assert!(h.root.join("my_site").join(METADATA_FILE).is_file());

        let listing = h.manager.list_all().await?;
        assert_eq!(
            listing.message,
            "All environments:\n- My Site (slug: my_site) - port: 8080, definition: yes, state: running"
        );
        Ok(())
    }

    #[test]
    async fn creating_twice_leaves_the_first_untouched() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Shop", "wordpress", 8080, "{}").await?;
        let before = h.definition("shop");

        let err = h
            .manager
            .create("shop", "wordpress", 9090, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::AlreadyExists { ref slug, .. } if slug == "shop"));
        assert_eq!(h.definition("shop"), before);
        assert_eq!(h.fake.calls_starting_with("up shop"), 1);
        Ok(())
    }

    #[test]
    async fn invalid_create_requests_touch_nothing() -> Result<()> {
        let h = Harness::new().await?;

        let err = h.manager.create("Blog", "drupal", 8080, "{}").await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(ref m) if m.contains("unsupported kind")));

        let err = h.manager.create("Blog", "wordpress", 0, "{}").await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(_)));

        let err = h
            .manager
            .create("Blog", "wordpress", 8080, "{plugins")
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(_)));

        let err = h.manager.create("!!!", "wordpress", 8080, "{}").await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(_)));

        assert_eq!(std::fs::read_dir(&h.root)?.count(), 0);
        assert!(h.fake.calls().is_empty());
        Ok(())
    }

    #[test]
    async fn stop_and_start_change_reported_state() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Demo", "wordpress", 8080, "{}").await?;

        let report = h.manager.stop("Demo").await?;
        assert_eq!(report.message, "Environment 'Demo' stopped.");
        assert_eq!(
            h.manager.list_scoped().await?.message,
            "Environments and state:\n- Demo (slug: demo): stopped"
        );

        h.manager.start("demo").await?;
        assert_eq!(
            h.manager.list_scoped().await?.message,
            "Environments and state:\n- Demo (slug: demo): running"
        );
        Ok(())
    }

    #[test]
    async fn operations_on_missing_environments_report_not_found() -> Result<()> {
        let h = Harness::new().await?;

        for outcome in [
            h.manager.delete("ghost").await,
            h.manager.stop("ghost").await,
            h.manager.start("ghost").await,
            h.manager.modify("ghost", r#"{"port": 8081}"#).await,
        ] {
            assert!(matches!(outcome, Err(EnvError::NotFound { .. })));
        }
        assert!(h.fake.calls().is_empty());
        Ok(())
    }

    #[test]
    async fn delete_tears_down_and_removes_everything() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Gone Soon", "wordpress", 8080, "{}").await?;

        let report = h.manager.delete("Gone Soon").await?;
        assert_eq!(report.message, "Environment 'Gone Soon' deleted.");
        assert_eq!(h.fake.calls_starting_with("down gone_soon"), 1);
        assert!(!h.root.join("gone_soon").exists());
        assert_eq!(h.manager.list_all().await?.message, NO_ENVIRONMENTS);
        Ok(())
    }

    #[test]
    async fn delete_without_definition_skips_teardown() -> Result<()> {
        let h = Harness::new().await?;
        std::fs::create_dir(h.root.join("leftover"))?;

        h.manager.delete("leftover").await?;
        assert!(!h.root.join("leftover").exists());
        assert_eq!(h.fake.calls_starting_with("down"), 0);
        Ok(())
    }

    #[test]
    async fn failed_directory_cleanup_is_partial() -> Result<()> {
        let temp = tempdir()?;
        let faults = Faults {
            remove: true,
            ..Faults::default()
        };
        let (manager, fake) = faulty_manager(temp.path(), faults).await?;

        manager.create("Sticky", "wordpress", 8080, "{}").await?;
        let err = manager.delete("Sticky").await.unwrap_err();

        assert!(matches!(err, EnvError::PartialCleanupFailure { ref slug, .. } if slug == "sticky"));
        assert_eq!(fake.calls_starting_with("down sticky"), 1);
        assert!(temp.path().join("sticky").join(DEFINITION_FILE).is_file());
        Ok(())
    }

    #[test]
    async fn failed_teardown_keeps_the_environment() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Held", "wordpress", 8080, "{}").await?;
        h.fake.with(|s| s.fail_down = true);

        let err = h.manager.delete("Held").await.unwrap_err();
        assert!(matches!(err, EnvError::OrchestrationFailure { .. }));
        assert_eq!(err.to_string(), "down failed with exit code 1: simulated failure");
        assert!(h.definition("held").contains("8080:80"));
        assert!(h.manager.list_scoped().await?.message.contains("(slug: held)"));
        Ok(())
    }

    #[test]
    async fn failed_definition_write_removes_the_new_directory() -> Result<()> {
        let temp = tempdir()?;
        let faults = Faults {
            write_definition: true,
            ..Faults::default()
        };
        let (manager, fake) = faulty_manager(temp.path(), faults).await?;

        let err = manager.create("Half", "wordpress", 8080, "{}").await.unwrap_err();
        assert!(matches!(err, EnvError::Io(_)));
        assert!(!temp.path().join("half").exists());
        assert!(fake.calls().is_empty());
        Ok(())
    }

    #[test]
    async fn failed_metadata_write_is_a_warning() -> Result<()> {
        let temp = tempdir()?;
        let faults = Faults {
            write_metadata: true,
            ..Faults::default()
        };
        let (manager, fake) = faulty_manager(temp.path(), faults).await?;

        let report = manager.create("No Meta", "wordpress", 8080, "{}").await?;
        assert!(report.message.starts_with("Environment 'No Meta' created and started"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("metadata could not be saved"));
        assert_eq!(fake.calls_starting_with("up no_meta"), 1);

        assert_eq!(
            manager.list_all().await?.message,
            "All environments:\n- no_meta (slug: no_meta) - port: unknown, definition: yes, state: running"
        );
        Ok(())
    }

    #[test]
    async fn failed_start_keeps_the_definition_for_retry() -> Result<()> {
        let h = Harness::new().await?;
        h.fake.with(|s| s.fail_up = true);

        let err = h.manager.create("Flaky", "wordpress", 8080, "{}").await.unwrap_err();
        assert!(matches!(err, EnvError::OrchestrationFailure { .. }));
        assert!(h.definition("flaky").contains("8080:80"));
        assert!(h
            .manager
            .list_all()
            .await?
            .message
            .contains("(slug: flaky) - port: 8080, definition: yes, state: stopped"));

        h.fake.with(|s| s.fail_up = false);
        h.manager.start("Flaky").await?;
        assert!(h.manager.list_scoped().await?.message.ends_with("flaky): running"));
        Ok(())
    }

    #[test]
    async fn modify_port_changes_exactly_one_mapping() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Port Test", "wordpress", 8080, "{}").await?;
        let before: serde_yaml::Value = serde_yaml::from_str(&h.definition("port_test"))?;

        let report = h.manager.modify("Port Test", r#"{"port": 8081}"#).await?;
        assert_eq!(
            report.message,
            "Port of 'Port Test' changed from 8080 to 8081 and the environment was restarted."
        );

        let after: serde_yaml::Value = serde_yaml::from_str(&h.definition("port_test"))?;
        let mut expected = before.clone();
        expected["services"]["wordpress"]["ports"][0] = serde_yaml::Value::from("8081:80");
        assert_eq!(after, expected);

        assert!(h
            .manager
            .list_all()
            .await?
            .message
            .contains("port: 8081, definition: yes"));
        assert_eq!(h.fake.calls_starting_with("up port_test"), 2);
        Ok(())
    }

    #[test]
    async fn modify_port_is_idempotent() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Same", "wordpress", 8080, "{}").await?;
        h.manager.modify("Same", r#"{"portti": "8082"}"#).await?;
        let once = h.definition("same");

        let report = h.manager.modify("same", r#"{"port": 8082}"#).await?;
        assert_eq!(
            report.message,
            "Port of 'same' is already 8082; the environment was re-applied."
        );
        assert_eq!(h.definition("same"), once);
        Ok(())
    }

    #[test]
    async fn rejected_modify_requests_mutate_nothing() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Stable", "wordpress", 8080, "{}").await?;
        let before = h.definition("stable");
        let calls = h.fake.calls().len();

        let err = h.manager.modify("Stable", "{port: 1").await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(_)));

        let err = h.manager.modify("Stable", r#"{"port": 70000}"#).await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidInput(_)));

        let err = h.manager.modify("Stable", r#"{"theme": "dark"}"#).await.unwrap_err();
        assert!(matches!(err, EnvError::Unsupported { .. }));
        assert_eq!(
            err.to_string(),
            "No changes made. Supported options: port, plugins"
        );

        assert_eq!(h.definition("stable"), before);
        assert_eq!(h.fake.calls().len(), calls);
        Ok(())
    }

    #[test]
    async fn modify_refuses_a_definition_it_cannot_edit() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Custom", "wordpress", 8080, "{}").await?;
        let custom = "services:\n  web:\n    image: nginx\n";
        std::fs::write(h.root.join("custom").join(DEFINITION_FILE), custom)?;

        let err = h.manager.modify("Custom", r#"{"port": 9000}"#).await.unwrap_err();
        assert!(matches!(err, EnvError::MalformedDefinition { .. }));
        assert_eq!(h.definition("custom"), custom);
        Ok(())
    }

    #[test]
    async fn modify_keeps_structure_but_not_comments() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Notes", "wordpress", 8080, "{}").await?;
        let generated = h.definition("notes");
        let hand_edited = format!("# my notes\n{}# end of file\n", generated);
        std::fs::write(h.root.join("notes").join(DEFINITION_FILE), &hand_edited)?;

        h.manager.modify("Notes", r#"{"port": 9090}"#).await?;

        let edited = h.definition("notes");
        let mut expected: serde_yaml::Value = serde_yaml::from_str(&generated)?;
        expected["services"]["wordpress"]["ports"][0] = serde_yaml::Value::from("9090:80");
        assert_eq!(serde_yaml::from_str::<serde_yaml::Value>(&edited)?, expected);
        assert!(!edited.contains("# my notes"));
        assert!(!edited.contains("# end of file"));
        Ok(())
    }

    #[test]
    async fn modify_applies_port_then_plugins() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Both", "wordpress", 8080, "{}").await?;

        let report = h
            .manager
            .modify("Both", r#"{"plugins": ["seo"], "port": 9090}"#)
            .await?;
        assert_eq!(
            report.message,
            "Port of 'Both' changed from 8080 to 9090 and the environment was restarted. \
             Plugin installation attempted in 'Both'. Plugins installed: seo."
        );
        assert!(report.is_clean());
        assert!(h.definition("both").contains("9090:80"));

        let calls = h.fake.calls();
        let tail: Vec<_> = calls.iter().skip(1).map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "up both",
                "exec both wpcli wp plugin install seo --activate --allow-root",
            ]
        );
        Ok(())
    }

    #[test]
    async fn plugins_fall_back_to_the_application_service() -> Result<()> {
        let h = Harness::new().await?;
        h.fake.with(|s| {
            s.failing_exec.insert("wpcli".to_string());
        });

        let report = h
            .manager
            .create("Store", "wordpress", 8080, r#"{"plugins": ["woocommerce"]}"#)
            .await?;
        assert!(report.message.ends_with("Plugins installed: woocommerce."));
        assert!(report.is_clean());

        let calls = h.fake.calls();
        let execs: Vec<_> = calls.iter().filter(|c| c.starts_with("exec")).collect();
        assert_eq!(
            execs,
            vec![
                "exec store wpcli wp plugin install woocommerce --activate --allow-root",
                "exec store wordpress wp plugin install woocommerce --activate --allow-root",
            ]
        );
        Ok(())
    }

    #[test]
    async fn unavailable_plugins_become_warnings() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Lab", "wordpress", 8080, "{}").await?;
        h.fake.with(|s| {
            s.failing_exec.insert("wpcli".to_string());
            s.failing_exec.insert("wordpress".to_string());
        });

        let report = h.manager.modify("Lab", r#"{"plugins": ["akismet"]}"#).await?;
        assert_eq!(report.message, "Plugin installation attempted in 'Lab'.");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("'akismet'"));
        assert!(report.warnings[0].contains("may need manual installation"));
        assert!(report.to_string().contains("\nWarning: plugin 'akismet'"));
        Ok(())
    }

    #[test]
    async fn listings_distinguish_directories_without_definition() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Alpha", "wordpress", 8080, "{}").await?;
        std::fs::create_dir(h.root.join("bare"))?;

        assert_eq!(
            h.manager.list_all().await?.message,
            "All environments:\n\
             - Alpha (slug: alpha) - port: 8080, definition: yes, state: running\n\
             - bare (slug: bare) - port: unknown, definition: no, state: absent"
        );
        assert_eq!(
            h.manager.list_scoped().await?.message,
            "Environments and state:\n- Alpha (slug: alpha): running"
        );

        h.fake.with(|s| s.fail_ps = true);
        assert!(h.manager.list_scoped().await?.message.ends_with("alpha): unknown"));
        Ok(())
    }

    #[test]
    async fn listing_bounds_concurrent_state_queries() -> Result<()> {
        let h = Harness::new().await?;
        let total = STATE_QUERY_CONCURRENCY * 2 + 3;
        for i in 0..total {
            h.manager
                .create(&format!("site {:02}", i), "wordpress", 8000 + i as u16, "{}")
                .await?;
        }
        h.fake.with(|s| s.ps_delay = Some(Duration::from_millis(10)));

        let listing = h.manager.list_all().await?;
        assert_eq!(listing.message.lines().count(), total + 1);
        assert!(listing.message.lines().nth(1).unwrap_or_default().contains("(slug: site_00)"));

        let peak = h.fake.with(|s| s.ps_peak);
        assert!(peak > 1, "state queries should overlap");
        assert!(peak <= STATE_QUERY_CONCURRENCY, "peak of {} queries", peak);
        Ok(())
    }

    #[test]
    async fn empty_root_lists_nothing() -> Result<()> {
        let h = Harness::new().await?;
        assert_eq!(h.manager.list_all().await?.message, NO_ENVIRONMENTS);
        assert_eq!(h.manager.list_scoped().await?.message, NO_ENVIRONMENTS);
        Ok(())
    }

    #[test]
    async fn inspect_describes_one_environment() -> Result<()> {
        let h = Harness::new().await?;
        h.manager.create("Peek", "wordpress", 8085, "{}").await?;

        let report = h.manager.inspect("peek").await?;
        assert!(report.message.starts_with("Environment 'Peek' (slug: peek)"));
        assert!(report.message.contains("type: wordpress"));
        assert!(report.message.contains("port: 8085"));
        assert!(report.message.contains("services: db, wordpress, wpcli"));
        Ok(())
    }

    #[test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_one_slug_yield_one_environment() -> Result<()> {
        let h = Harness::new().await?;
        h.fake.with(|s| s.up_delay = Some(Duration::from_millis(20)));

        let handles: Vec<_> = ["Race Site", "race site", "RACE   SITE"]
            .into_iter()
            .map(|name| {
                let manager = h.manager.clone();
                tokio::spawn(async move { manager.create(name, "wordpress", 8080, "{}").await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, EnvError::AlreadyExists { .. })),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(h.fake.calls_starting_with("up race_site"), 1);
        Ok(())
    }

    #[test]
    async fn tool_dispatch_answers_with_text() -> Result<()> {
        let h = Harness::new().await?;

        let text = dispatch(
            &h.manager,
            "env_create",
            &json!({"name": "Tool Site", "port": 8090, "options": {"plugins": ["akismet"]}}),
        )
        .await;
        assert!(text.starts_with("Environment 'Tool Site' created and started on port 8090"));
        assert!(text.ends_with("Plugins installed: akismet."));

        let text = dispatch(
            &h.manager,
            "env_modify",
            &json!({"name": "Tool Site", "options": "{\"port\": 8091}"}),
        )
        .await;
        assert!(text.contains("changed from 8090 to 8091"));

        let text = dispatch(&h.manager, "env_list_all", &json!({})).await;
        assert!(text.contains("(slug: tool_site) - port: 8091"));

        let text = dispatch(&h.manager, "env_stop", &json!({"name": "nobody"})).await;
        assert_eq!(text, "Error: Environment 'nobody' (slug: nobody) was not found");

        let text = dispatch(&h.manager, "env_reboot", &json!({})).await;
        assert!(text.starts_with("Error: Invalid input: unknown tool 'env_reboot'"));

        let text = dispatch(&h.manager, "env_create", &json!({"name": "x"})).await;
        assert!(text.starts_with("Error: Invalid input: invalid arguments for env_create"));
        Ok(())
    }
}
