//! Injected trace sink for per-node lowering traces.
//!
//! The lowerer takes an optional sink instead of writing to a process-wide
//! logger; with no sink installed, tracing costs nothing.

/// Receives one human-readable line per traced lowering event.
pub trait TraceSink {
    fn trace(&mut self, message: &str);
}

/// Sink that writes each trace line to standard error.
pub struct StderrTrace;

impl TraceSink for StderrTrace {
    fn trace(&mut self, message: &str) {
        eprintln!("[lower] {message}");
    }
}
