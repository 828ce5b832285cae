//! The Interactive Input Router: feeds follow-up user messages into the
//! agent's stdin from whichever of three mutually exclusive sources is
//! active, and closes stdin exactly once when the run is done.

mod router;
mod terminal;

pub use router::InputRouter;
pub use terminal::TerminalReader;
