// lwdb - lightweight interactive Java debugger
//
// Session core (event loop, command interpreter, breakpoint table) driving a target
// through the `ExecutionControl` facade, plus the JDWP-backed facade and launcher.

pub mod breakpoints;
pub mod config;
pub mod console;
pub mod error;
mod event_loop;
pub mod interpreter;
pub mod jdwp_target;
pub mod launcher;
pub mod model;
pub mod session;
pub mod target;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Args;
pub use error::{CommandError, SessionError};
pub use session::{Session, SessionEnd};
pub use target::{ExecutionControl, TargetError};
