//! Lifecycle and cleanup: the `Invocation` entry point that owns one
//! end-to-end agent run and its temp directory, sockets, and subprocess.

mod cancel;
mod result;
mod run;

pub use cancel::CancelHandle;
pub use result::InvocationResult;
pub use run::Invocation;
