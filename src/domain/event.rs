use serde::Serialize;
use serde_json::Value;

/// Source tag attached to every event the adapter emits.
pub const EVENT_SOURCE: &str = "bankpay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured event handed to the [`EventLogger`](super::ports::EventLogger).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub severity: Severity,
    pub source: &'static str,
    pub message: String,
    pub context: Value,
}

impl LogEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: EVENT_SOURCE,
            message: message.into(),
            context: Value::Null,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}
