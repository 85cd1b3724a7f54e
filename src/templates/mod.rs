pub mod compose;

pub use compose::{set_published_port, ComposeFile, ComposeService, PortEdit};

use std::collections::BTreeMap;

use crate::core::EnvironmentKind;

/// Everything the manager needs to know about one environment kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTemplate {
    pub kind: EnvironmentKind,
    /// Service that publishes the requested host port.
    pub primary_service: &'static str,
    /// Container side of the primary service's port mapping.
    pub primary_container_port: u16,
    /// Services able to run the plugin manager, in the order they are tried.
    pub plugin_services: &'static [&'static str],
}

impl EnvironmentTemplate {
    pub fn for_kind(kind: EnvironmentKind) -> Self {
        match kind {
            EnvironmentKind::Wordpress => Self {
                kind,
                primary_service: "wordpress",
                primary_container_port: 80,
                plugin_services: &["wpcli", "wordpress"],
            },
        }
    }

    /// Generate the definition publishing the primary service on `port`.
    pub fn render(&self, port: u16) -> ComposeFile {
        match self.kind {
            EnvironmentKind::Wordpress => wordpress(port),
        }
    }

    /// Command that installs and activates `plugin` inside a service.
    pub fn plugin_install_command(&self, plugin: &str) -> Vec<String> {
        match self.kind {
            EnvironmentKind::Wordpress => ["wp", "plugin", "install", plugin, "--activate", "--allow-root"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Database, application, and a WP-CLI sidecar sharing the application volume.
fn wordpress(port: u16) -> ComposeFile {
    let mut services = BTreeMap::new();

    services.insert(
        "db".to_string(),
        ComposeService {
            image: "mysql:5.7".to_string(),
            restart: Some("always".to_string()),
            environment: env(&[
                ("MYSQL_DATABASE", "wordpress"),
                ("MYSQL_USER", "wordpress"),
                ("MYSQL_PASSWORD", "wordpress"),
                ("MYSQL_RANDOM_ROOT_PASSWORD", "1"),
            ]),
            volumes: vec!["db_data:/var/lib/mysql".to_string()],
            ..Default::default()
        },
    );

    services.insert(
        "wordpress".to_string(),
        ComposeService {
            image: "wordpress:latest".to_string(),
            depends_on: vec!["db".to_string()],
            ports: vec![format!("{}:80", port)],
            environment: env(&[
                ("WORDPRESS_DB_HOST", "db:3306"),
                ("WORDPRESS_DB_USER", "wordpress"),
                ("WORDPRESS_DB_PASSWORD", "wordpress"),
                ("WORDPRESS_DB_NAME", "wordpress"),
            ]),
            volumes: vec!["wordpress_data:/var/www/html".to_string()],
            ..Default::default()
        },
    );

    services.insert(
        "wpcli".to_string(),
        ComposeService {
            image: "wordpress:cli".to_string(),
            restart: Some("unless-stopped".to_string()),
            depends_on: vec!["wordpress".to_string()],
            volumes: vec!["wordpress_data:/var/www/html".to_string()],
            command: Some("tail -f /dev/null".to_string()),
            ..Default::default()
        },
    );

    let volumes = ["db_data", "wordpress_data"]
        .iter()
        .map(|name| (name.to_string(), None))
        .collect();

    ComposeFile { services, volumes }
}
