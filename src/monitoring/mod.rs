mod telemetry;

pub use telemetry::{init_telemetry, log_outcome, LogLevel, PerformanceTracker, TelemetryConfig};

/// Convenience macro for performance tracking
#[macro_export]
macro_rules! track_performance {
    ($name:expr) => {
        let _tracker = $crate::monitoring::PerformanceTracker::new($name);
    };
}
