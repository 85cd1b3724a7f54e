//! Lifecycle management for docker-compose WordPress environments.
//!
//! Each environment lives in its own directory under a root directory,
//! holding a compose definition and a small metadata record. The
//! [`environments::EnvironmentManager`] drives the compose tool through the
//! [`orchestration::Orchestrator`] seam, and [`tools`] exposes the operations
//! to an agent dispatcher as named tools returning text.

pub mod core;
pub mod environments;
pub mod monitoring;
pub mod orchestration;
pub mod plugins;
pub mod storage;
pub mod templates;
pub mod tools;

pub use crate::core::{EnvError, EnvResult, Report, Settings};
pub use crate::environments::EnvironmentManager;
