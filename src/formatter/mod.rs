//! Message Formatter & Failure Detector.
//!
//! Turns raw stream-json lines from the agent subprocess into
//! [`crate::types::formatted::FormattedMessage`]s ready for display, and
//! scans assistant text for buried `FAILED:` reports.

mod failure;
mod parser;
mod render;

pub use failure::detect_failure;
pub use parser::parse_message;
pub use render::Formatter;
