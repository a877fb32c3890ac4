// Execution control facade
//
// The narrow interface the session core uses to drive the target. The JDWP
// implementation lives in `jdwp_target`; tests use an in-memory fake.

use crate::model::{
    ArrayRef, ClassHandle, EventBatch, LocalVariable, Location, ObjectRef, RequestHandle, StackFrame,
    StepScope, ThreadHandle, Value,
};
use async_trait::async_trait;
use thiserror::Error;

pub type TargetResult<T> = Result<T, TargetError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The target has terminated or the connection to it is gone
    #[error("target not available: {0}")]
    NotAvailable(String),

    /// A name, line or index does not exist in the target
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("target error: {0}")]
    Other(String),
}

impl TargetError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, TargetError::NotAvailable(_))
    }
}

#[async_trait]
pub trait ExecutionControl: Send {
    /// Block until the target produces the next event set
    async fn next_events(&mut self) -> TargetResult<EventBatch>;

    /// Ask to be halted when classes matching `class_pattern` are prepared
    async fn watch_class_prepare(&mut self, class_pattern: &str) -> TargetResult<RequestHandle>;

    /// Executable locations of a source line within a class, lowest code index first
    async fn locations_of_line(&mut self, class: ClassHandle, line: u32) -> TargetResult<Vec<Location>>;

    /// Create and enable a breakpoint request
    async fn enable_breakpoint(&mut self, location: &Location) -> TargetResult<RequestHandle>;

    async fn delete_breakpoint(&mut self, request: RequestHandle) -> TargetResult<()>;

    /// Create a one-shot line step request on `thread`, limited to classes matching `class_filter`
    async fn create_step(
        &mut self,
        thread: ThreadHandle,
        scope: StepScope,
        class_filter: &str,
    ) -> TargetResult<RequestHandle>;

    async fn delete_step(&mut self, request: RequestHandle) -> TargetResult<()>;

    /// Resume every thread of the target
    async fn resume(&mut self) -> TargetResult<()>;

    /// Top `max` frames of a halted thread (all when `None`), innermost first
    async fn frames(&mut self, thread: ThreadHandle, max: Option<usize>) -> TargetResult<Vec<StackFrame>>;

    /// Visible locals of a frame with their current values
    async fn visible_variables(
        &mut self,
        thread: ThreadHandle,
        frame: &StackFrame,
    ) -> TargetResult<Vec<LocalVariable>>;

    /// Named field of an object, inherited fields included
    async fn field_value(&mut self, object: &ObjectRef, field: &str) -> TargetResult<Value>;

    async fn array_element(&mut self, array: &ArrayRef, index: usize) -> TargetResult<Value>;

    /// Every element of an array, in index order
    async fn array_values(&mut self, array: &ArrayRef) -> TargetResult<Vec<Value>>;

    /// Release the target: drop all requests and let it run free
    async fn detach(&mut self) -> TargetResult<()>;
}
