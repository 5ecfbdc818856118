//! Progress reporting hooks for the import pipeline.

/// Receives human-readable progress messages while an import runs.
///
/// Messages are advisory text for a status line or log; callers must not
/// parse them.
pub trait ProgressSink: Send + Sync {
    /// Called with one progress message.
    fn report(&self, message: &str);
}

/// Discards all progress messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _message: &str) {}
}

/// Forwards progress messages to the `tracing` subscriber at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, message: &str) {
        tracing::info!(target: "ledgris::import", "{message}");
    }
}
