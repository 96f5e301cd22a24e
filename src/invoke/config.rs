//! Configuration of the invocation boundary.

/// Tunables of [`crate::invoke::InvocationBoundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationConfig {
    /// Maximum number of bytes kept per captured console stream (default: 4 MiB)
    /// Output beyond the limit is dropped and the outcome is flagged as truncated
    pub capture_limit: usize,

    /// Stack size of the worker thread started by `spawn` (default: 16 MiB)
    /// Deeply recursive target code needs more than the platform default
    pub worker_stack_size: usize,

    /// Emit one `log` record per invocation outcome (default: true)
    pub log_outcomes: bool,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            capture_limit: 4 * 1024 * 1024,
            worker_stack_size: 16 * 1024 * 1024,
            log_outcomes: true,
        }
    }
}

impl InvocationConfig {
    /// The default configuration without per-invocation log records, for batch runs over
    /// many methods.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            log_outcomes: false,
            ..Self::default()
        }
    }

    /// Sets the per-stream capture limit.
    #[must_use]
    pub fn with_capture_limit(mut self, bytes: usize) -> Self {
        self.capture_limit = bytes;
        self
    }

    /// Sets the worker thread stack size.
    #[must_use]
    pub fn with_worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = bytes;
        self
    }
}
