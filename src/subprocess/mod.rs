//! The Subprocess Driver: launches the agent CLI, streams its stdout
//! through the Formatter, and resolves with the run's exit status.

mod command;
mod config;
mod driver;
mod reader;
mod watchdog;

pub use config::{Executor, PromptInput};
pub use driver::{DriverResult, SubprocessDriver};
pub use watchdog::{InactivityWatchdog, WatchdogEvent};
