use crate::domain::event::{LogEvent, Severity};
use crate::domain::ports::EventLogger;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Forwards adapter events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn record(&self, event: LogEvent) {
        let context = event.context.to_string();
        match event.severity {
            Severity::Info => {
                tracing::info!(source = event.source, context = %context, "{}", event.message)
            }
            Severity::Warning => {
                tracing::warn!(source = event.source, context = %context, "{}", event.message)
            }
            Severity::Error => {
                tracing::error!(source = event.source, context = %context, "{}", event.message)
            }
        }
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
