//! Logger Collaborator
//!
//! Consumed, never owned: the facade accepts any `(scope, message)` sink at
//! debug/info/warn/error severities. Logging must never block or fail.
//!
//! [`TracingLogger`] forwards to the `tracing` ecosystem for production;
//! [`BufferLogger`] captures lines so tests can assert on the observable
//! logging side effects the contract requires.

use std::sync::{Arc, Mutex};

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Lifecycle events
    Info,
    /// Recoverable oddities
    Warn,
    /// Failures
    Error,
}

/// A leveled `(scope, message)` sink.
pub trait Logger: Send + Sync {
    /// Record one line.
    fn log(&self, level: LogLevel, scope: &str, message: &str);

    /// Record at debug severity.
    fn debug(&self, scope: &str, message: &str) {
        self.log(LogLevel::Debug, scope, message);
    }

    /// Record at info severity.
    fn info(&self, scope: &str, message: &str) {
        self.log(LogLevel::Info, scope, message);
    }

    /// Record at warn severity.
    fn warn(&self, scope: &str, message: &str) {
        self.log(LogLevel::Warn, scope, message);
    }

    /// Record at error severity.
    fn error(&self, scope: &str, message: &str) {
        self.log(LogLevel::Error, scope, message);
    }
}

// =============================================================================
// TracingLogger
// =============================================================================

/// Production logger forwarding to [`tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, scope: &str, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(scope, "{}", message),
            LogLevel::Info => tracing::info!(scope, "{}", message),
            LogLevel::Warn => tracing::warn!(scope, "{}", message),
            LogLevel::Error => tracing::error!(scope, "{}", message),
        }
    }
}

// =============================================================================
// BufferLogger
// =============================================================================

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Severity of the line
    pub level: LogLevel,
    /// Component scope
    pub scope: String,
    /// Message text
    pub message: String,
}

/// Capturing logger, primarily for testing.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferLogger {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl BufferLogger {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap().clone()
    }

    /// Number of captured lines at a severity.
    #[must_use]
    pub fn count(&self, level: LogLevel) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.level == level)
            .count()
    }

    /// Drop all captured lines.
    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }
}

impl Logger for BufferLogger {
    fn log(&self, level: LogLevel, scope: &str, message: &str) {
        self.lines.lock().unwrap().push(LogLine {
            level,
            scope: scope.to_string(),
            message: message.to_string(),
        });
    }
}
