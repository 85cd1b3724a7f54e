use thiserror::Error;

/// Failure outcomes of a lifecycle operation.
///
/// None of these abort the caller: every variant renders to a status line
/// that the dispatching layer relays back to the user.
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment '{name}' (slug: {slug}) was not found")]
    NotFound { name: String, slug: String },

    #[error("Environment '{name}' already exists (slug: {slug})")]
    AlreadyExists { name: String, slug: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{action} failed{}: {stderr}", exit_suffix(.code))]
    OrchestrationFailure {
        action: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Containers of '{slug}' were stopped and removed, but directory cleanup failed: {reason}")]
    PartialCleanupFailure { slug: String, reason: String },

    #[error("No changes made. Supported options: {}", .supported.join(", "))]
    Unsupported { supported: Vec<&'static str> },

    #[error("Definition of '{slug}' cannot be edited: {reason}")]
    MalformedDefinition { slug: String, reason: String },

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

impl EnvError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EnvError::InvalidInput(message.into())
    }

    /// Stable short name of the variant, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvError::NotFound { .. } => "not_found",
            EnvError::AlreadyExists { .. } => "already_exists",
            EnvError::InvalidInput(_) => "invalid_input",
            EnvError::OrchestrationFailure { .. } => "orchestration_failure",
            EnvError::PartialCleanupFailure { .. } => "partial_cleanup_failure",
            EnvError::Unsupported { .. } => "unsupported",
            EnvError::MalformedDefinition { .. } => "malformed_definition",
            EnvError::Io(_) => "io",
        }
    }
}

pub type EnvResult<T> = Result<T, EnvError>;
