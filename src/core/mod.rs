pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::{EnvError, EnvResult};
pub use types::{
    render, slugify, EnvironmentKind, EnvironmentMetadata, EnvironmentSummary, Report,
    RuntimeState,
};
