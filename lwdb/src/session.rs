// Debug session
//
// Owns the execution controller, the operator console and all request bookkeeping.
// The event loop (`event_loop.rs`) and the command interpreter (`interpreter.rs`)
// are implemented as further `impl Session` blocks.

use crate::breakpoints::BreakpointTable;
use crate::console::Console;
use crate::error::SessionError;
use crate::interpreter::HELP;
use crate::model::{ClassHandle, RequestHandle, StepScope, ThreadHandle};
use crate::target::{ExecutionControl, TargetError};
use tracing::{info, warn};

/// Thread and class the operator's commands apply to; set on class-prepared and halts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltContext {
    pub thread: ThreadHandle,
    pub class: ClassHandle,
}

/// The single outstanding step request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStep {
    pub request: RequestHandle,
    pub thread: ThreadHandle,
    pub scope: StepScope,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The target reported its own disconnection
    Disconnected,
    /// The connection broke without a disconnect event
    ConnectionLost,
    /// The operator exited the interpreter
    OperatorExit,
}

pub struct Session<T, C> {
    pub(crate) target: T,
    pub(crate) console: C,
    pub(crate) breakpoints: BreakpointTable,
    pub(crate) step: Option<ActiveStep>,
    pub(crate) context: Option<HaltContext>,
    /// Fully-qualified name of the target's entry class; filters class-prepare and steps
    pub(crate) entry_class: String,
}

impl<T, C> Session<T, C>
where
    T: ExecutionControl,
    C: Console,
{
    pub fn new(target: T, console: C, entry_class: impl Into<String>) -> Self {
        Self {
            target,
            console,
            breakpoints: BreakpointTable::new(),
            step: None,
            context: None,
            entry_class: entry_class.into(),
        }
    }

    /// Run the whole session: greet, watch for the entry class, drain events until the
    /// target goes away or the operator exits, then release the target
    pub async fn start(&mut self) -> Result<SessionEnd, SessionError> {
        self.console.say("Welcome to the debugger");
        for line in HELP {
            self.console.say(line);
        }

        match self.target.watch_class_prepare(&self.entry_class).await {
            Ok(request) => info!("Watching for {} (request {})", self.entry_class, request),
            Err(TargetError::NotAvailable(reason)) => {
                warn!("Target gone before the session started: {}", reason);
                return Err(SessionError::TargetDisconnected);
            }
            Err(e) => return Err(e.into()),
        }

        let end = self.run().await;
        info!("Session ended: {:?}", end);

        if end == SessionEnd::OperatorExit {
            if let Err(e) = self.target.detach().await {
                warn!("Failed to release target: {}", e);
            }
        }

        Ok(end)
    }

    /// Forget all request bookkeeping; used once the target is gone
    pub(crate) fn abandon_requests(&mut self) {
        self.breakpoints.clear();
        self.step = None;
        self.context = None;
    }

    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.breakpoints
    }

    pub fn active_step(&self) -> Option<ActiveStep> {
        self.step
    }
}
