// JDWP client library
//
// Async client for the subset of JDWP an interactive line debugger needs:
// - Connection management and event delivery
// - Breakpoint, step and class-prepare requests
// - Stack, local variable, field and array inspection
// - Execution control

pub mod array;
pub mod commands;
pub mod connection;
pub mod eventloop;
pub mod eventrequest;
pub mod events;
pub mod method;
pub mod object;
pub mod protocol;
pub mod reader;
pub mod reftype;
pub mod stackframe;
pub mod string;
pub mod thread;
pub mod types;
pub mod vm;

pub use connection::JdwpConnection;
pub use eventrequest::SuspendPolicy;
pub use events::{Event, EventKind, EventSet};
pub use protocol::{JdwpError, JdwpResult};
