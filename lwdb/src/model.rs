// Location and value model
//
// Plain data handed out by the execution controller. Nothing here talks to the target.

use std::fmt;

/// Opaque handle of a thread in the target
pub type ThreadHandle = u64;

/// Opaque handle of a loaded class (executable unit container)
pub type ClassHandle = u64;

/// Handle of an event request registered with the execution controller
pub type RequestHandle = i32;

/// A position in target code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub class: ClassHandle,
    pub class_name: String,
    pub method: u64,
    pub method_name: String,
    /// Source line, absent for code without line information
    pub line: Option<u32>,
    /// Bytecode index inside the method
    pub code_index: u64,
}

impl Location {
    pub fn line_display(&self) -> String {
        match self.line {
            Some(line) => line.to_string(),
            None => "?".to_string(),
        }
    }

    /// `Class.method`
    pub fn qualified_method(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_name, self.line_display())
    }
}

/// Reference to an array in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRef {
    pub id: u64,
    /// Element type name, e.g. `int`
    pub element_type: String,
    pub length: usize,
}

/// Reference to a non-array, non-string object in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: u64,
    pub type_id: ClassHandle,
    pub type_name: String,
}

/// Snapshot of a runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Array(ArrayRef),
    Object(ObjectRef),
    /// null reference or void
    None,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "'{}'", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Array(a) => write!(f, "{}[{}] @{:x}", a.element_type, a.length, a.id),
            Value::Object(o) => write!(f, "{} @{:x}", o.type_name, o.id),
            Value::None => write!(f, "null"),
        }
    }
}

/// A visible local variable of a halted frame
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub declared_type: String,
    pub value: Value,
}

impl fmt::Display for LocalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.name, self.declared_type, self.value)
    }
}

/// One frame of a suspended thread; only valid while the target stays halted
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub id: u64,
    pub location: Location,
}

/// Step scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepScope {
    /// Stay within the current call
    Over,
    /// Follow into calls
    Into,
}

/// Events the execution controller reports, already classified
#[derive(Debug, Clone, PartialEq)]
pub enum TargetEvent {
    ClassPrepared {
        thread: ThreadHandle,
        class: ClassHandle,
        class_name: String,
    },
    BreakpointHit {
        request: RequestHandle,
        thread: ThreadHandle,
        location: Location,
    },
    StepCompleted {
        request: RequestHandle,
        thread: ThreadHandle,
        location: Location,
    },
    Disconnected,
    Other,
}

/// Events delivered together; if `suspended`, the target is halted until resumed
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub suspended: bool,
    pub events: Vec<TargetEvent>,
}
