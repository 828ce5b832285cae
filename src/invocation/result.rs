//! Outcome of one completed (or killed) `Invocation::run` call.

use crate::types::{FailureReport, FormattedMessage};

/// Everything a caller needs to interpret how an `Invocation` ended: a
/// non-fatal non-zero exit, an inactivity kill, and a buried `FAILED:`
/// report are all distinct outcomes carried here rather than collapsed
/// into a single success bit.
#[derive(Debug, Clone, Default)]
pub struct InvocationResult {
    /// Process exit code, if the process actually exited on its own or was
    /// reaped after being killed.
    pub exit_code: Option<i32>,
    /// Set when the Driver killed the process for inactivity rather than
    /// the agent exiting by itself.
    pub killed_by_inactivity: bool,
    /// `false` iff a `FAILED:` report was observed in the agent's output.
    /// Independent of `exit_code`: a clean exit can still carry a failure
    /// report, and a non-zero exit in non-review modes is surfaced here
    /// without flipping this to `false` on its own.
    pub success: bool,
    /// Populated iff a `FAILED:` line was observed anywhere in the agent's
    /// assistant output.
    pub failure: Option<FailureReport>,
    /// Retained output, shaped by the run's `CapturePolicy`: empty for
    /// `None`, every rendered message for `All`, just the terminal `result`
    /// message (if any) for `ResultOnly`.
    pub captured: Vec<FormattedMessage>,
}
