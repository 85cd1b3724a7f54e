use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{EnvError, EnvResult};

/// Maximum length of a slug, in characters.
pub const SLUG_MAX_LEN: usize = 128;

/// Convert a display name into the filesystem and service safe key used on disk.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            slug.push(c);
        }
    }

    slug.chars().take(SLUG_MAX_LEN).collect()
}

/// Supported environment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Wordpress,
}

impl EnvironmentKind {
    pub const SUPPORTED: &'static [&'static str] = &["wordpress"];

    pub fn parse(kind: &str) -> EnvResult<Self> {
        match kind.trim().to_lowercase().as_str() {
            "wordpress" => Ok(EnvironmentKind::Wordpress),
            other => Err(EnvError::invalid(format!(
                "unsupported kind '{}'. Currently supported: {}",
                other,
                Self::SUPPORTED.join(", ")
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Wordpress => "wordpress",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata persisted next to the definition.
///
/// `kind` is kept as free text so hand-written records with unknown types
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMetadata {
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl EnvironmentMetadata {
    pub fn new(display_name: &str, kind: EnvironmentKind, port: u16) -> Self {
        Self {
            display_name: display_name.to_string(),
            kind: kind.as_str().to_string(),
            port: Some(port),
            created_at: Some(Utc::now()),
        }
    }
}

/// Runtime state, derived on demand from the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeState {
    Running,
    Stopped,
    Unknown,
    Absent,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeState::Running => write!(f, "running"),
            RuntimeState::Stopped => write!(f, "stopped"),
            RuntimeState::Unknown => write!(f, "unknown"),
            RuntimeState::Absent => write!(f, "absent"),
        }
    }
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSummary {
    pub slug: String,
    pub display_name: String,
    pub kind: Option<String>,
    pub port: Option<u16>,
    pub has_definition: bool,
    pub state: RuntimeState,
}

/// Successful outcome of an operation plus any non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub message: String,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for warning in &self.warnings {
            write!(f, "\nWarning: {}", warning)?;
        }
        Ok(())
    }
}

/// Render any operation outcome as the text handed back to the caller.
pub fn render(outcome: &EnvResult<Report>) -> String {
    match outcome {
        Ok(report) => report.to_string(),
        Err(err) => format!("Error: {}", err),
    }
}
