//! The diagnostic sink consumed by the tree builder.
//!
//! Assembly problems (self-parent spans, orphans, missing roots) are
//! data-quality signals, not errors, so they are reported through a logger
//! rather than returned to the caller. The logger is passed explicitly to
//! [`TreeBuilder::new`] instead of being looked up from a global, so backends
//! can route per-trace diagnostics wherever they keep such signals.
//!
//! [`TreeBuilder::new`]: crate::tree::TreeBuilder::new

use std::sync::{Arc, Mutex};

/// Sink for the fine-grained diagnostics emitted during trace assembly.
pub trait Logger {
    /// Whether fine-grained output is wanted.
    ///
    /// Callers gate message formatting on this, so a disabled logger costs no
    /// allocation.
    fn enabled(&self) -> bool {
        true
    }

    /// Records one diagnostic message.
    fn log(&self, message: &str);
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn enabled(&self) -> bool {
        false
    }

    fn log(&self, _message: &str) {}
}

/// Forwards messages to [`tracing`] at DEBUG level.
#[cfg(feature = "internal-logs")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "internal-logs")]
impl Logger for TracingLogger {
    fn enabled(&self) -> bool {
        tracing::enabled!(target: env!("CARGO_PKG_NAME"), tracing::Level::DEBUG)
    }

    fn log(&self, message: &str) {
        tracing::debug!(target: env!("CARGO_PKG_NAME"), "{message}");
    }
}

/// Captures messages in memory so they can be asserted on.
///
/// Clones share storage; keep one handle and pass a clone to the builder.
///
/// # Example
///
/// ```
/// use trace_tree::{MemoryLogger, TraceId, TreeBuilder};
///
/// let logger = MemoryLogger::new();
/// let builder = TreeBuilder::new(TraceId::from(1), logger.clone());
/// let _tree = builder.build();
///
/// assert_eq!(
///     logger.messages(),
///     ["substituting dummy node for missing root span: traceId=0000000000000001"]
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryLogger {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Clears the recorded messages.
    pub fn reset(&self) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_owned());
        }
    }
}
