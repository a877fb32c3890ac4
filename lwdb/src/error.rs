// Session and command errors

use crate::target::TargetError;
use thiserror::Error;

/// Operator-input errors. Reported inline; the interpreter keeps reading commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("No executable location for line {0}")]
    NoLocationForLine(u32),

    #[error("variable: {0} not found. Probably a wrong input.")]
    NoSuchVariable(String),

    #[error("Field {0} cannot be found, probably a wrong input.")]
    NoSuchField(String),

    #[error("Index out of bounds: {index} (length {length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("Not a valid number: {0:?}")]
    MalformedNumericInput(String),

    #[error("Breakpoint already set at line {0}")]
    DuplicateBreakpoint(u32),

    #[error("No halted thread to operate on")]
    NoContext,

    /// Operator input ended while a prompt was waiting
    #[error("input closed")]
    InputClosed,

    #[error(transparent)]
    Target(#[from] TargetError),
}

impl CommandError {
    /// Errors that end the interpreter instead of being reported
    pub fn is_fatal(&self) -> bool {
        match self {
            CommandError::InputClosed => true,
            CommandError::Target(e) => e.is_disconnect(),
            _ => false,
        }
    }
}

/// Errors that cross component boundaries and end the session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch target: {0}")]
    LaunchFailure(String),

    #[error("target disconnected")]
    TargetDisconnected,

    #[error(transparent)]
    Target(#[from] TargetError),
}
