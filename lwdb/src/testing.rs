// In-memory target and scripted console for session tests

use crate::console::Console;
use crate::model::{
    ArrayRef, ClassHandle, EventBatch, LocalVariable, Location, ObjectRef, RequestHandle, StackFrame,
    StepScope, TargetEvent, ThreadHandle, Value,
};
use crate::session::HaltContext;
use crate::target::{ExecutionControl, TargetError, TargetResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};

pub const CALC_CLASS: ClassHandle = 0x10;
pub const MAIN_THREAD: ThreadHandle = 1;
const MAIN_METHOD: u64 = 0x40;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NextEvents,
    WatchClassPrepare(String),
    LocationsOfLine(u32),
    EnableBreakpoint(u32),
    DeleteBreakpoint(RequestHandle),
    CreateStep(ThreadHandle, StepScope),
    DeleteStep(RequestHandle),
    Resume,
    Frames,
    VisibleVariables,
    FieldValue(String),
    ArrayElement(usize),
    ArrayValues(u64),
    Detach,
}

pub fn location(line: u32) -> Location {
    Location {
        class: CALC_CLASS,
        class_name: "Calc".to_string(),
        method: MAIN_METHOD,
        method_name: "main".to_string(),
        line: Some(line),
        code_index: line as u64,
    }
}

pub fn breakpoint_context() -> HaltContext {
    HaltContext {
        thread: MAIN_THREAD,
        class: CALC_CLASS,
    }
}

pub fn class_prepared() -> TargetEvent {
    TargetEvent::ClassPrepared {
        thread: MAIN_THREAD,
        class: CALC_CLASS,
        class_name: "Calc".to_string(),
    }
}

pub fn breakpoint_hit(request: RequestHandle, line: u32) -> TargetEvent {
    TargetEvent::BreakpointHit {
        request,
        thread: MAIN_THREAD,
        location: location(line),
    }
}

pub fn step_completed(request: RequestHandle, line: u32) -> TargetEvent {
    TargetEvent::StepCompleted {
        request,
        thread: MAIN_THREAD,
        location: location(line),
    }
}

/// Scripted stand-in for a JVM: a single class `Calc` with a `main` method halted at
/// line 5. Every call is recorded in `calls`.
pub struct FakeTarget {
    pub calls: Vec<Call>,
    /// Lines of `Calc` that carry code
    pub lines: Vec<u32>,
    pub script: VecDeque<TargetResult<EventBatch>>,
    pub locals: Vec<LocalVariable>,
    pub fields: HashMap<(u64, String), Value>,
    pub arrays: HashMap<u64, Vec<Value>>,
    pub frame_line: u32,
    pub fail_enable: bool,
    pub fail_steps: bool,
    /// Returned by every call once set
    pub fail_all: Option<TargetError>,
    next_request: RequestHandle,
    breakpoints: BTreeMap<RequestHandle, u32>,
    steps: BTreeMap<RequestHandle, ThreadHandle>,
}

impl FakeTarget {
    pub fn with_lines(lines: &[u32]) -> Self {
        Self {
            calls: Vec::new(),
            lines: lines.to_vec(),
            script: VecDeque::new(),
            locals: vec![LocalVariable {
                name: "x".to_string(),
                declared_type: "int".to_string(),
                value: Value::Int(3),
            }],
            fields: HashMap::new(),
            arrays: HashMap::new(),
            frame_line: 5,
            fail_enable: false,
            fail_steps: false,
            fail_all: None,
            next_request: 1,
            breakpoints: BTreeMap::new(),
            steps: BTreeMap::new(),
        }
    }

    pub fn push_batch(&mut self, events: Vec<TargetEvent>) {
        self.script.push_back(Ok(EventBatch {
            suspended: true,
            events,
        }));
    }

    pub fn push_disconnect(&mut self) {
        self.script.push_back(Ok(EventBatch {
            suspended: false,
            events: vec![TargetEvent::Disconnected],
        }));
    }

    pub fn push_error(&mut self, error: TargetError) {
        self.script.push_back(Err(error));
    }

    pub fn add_local(&mut self, name: &str, declared_type: &str, value: Value) {
        self.locals.push(LocalVariable {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            value,
        });
    }

    /// Lines with an enabled breakpoint request, ascending
    pub fn live_breakpoint_lines(&self) -> Vec<u32> {
        let mut lines: Vec<u32> = self.breakpoints.values().copied().collect();
        lines.sort_unstable();
        lines
    }

    pub fn live_steps(&self) -> Vec<(RequestHandle, ThreadHandle)> {
        self.steps.iter().map(|(r, t)| (*r, *t)).collect()
    }

    fn record(&mut self, call: Call) -> TargetResult<()> {
        self.calls.push(call);
        match &self.fail_all {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn allocate_request(&mut self) -> RequestHandle {
        let id = self.next_request;
        self.next_request += 1;
        id
    }
}

#[async_trait]
impl ExecutionControl for FakeTarget {
    async fn next_events(&mut self) -> TargetResult<EventBatch> {
        self.record(Call::NextEvents)?;
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(TargetError::NotAvailable("script exhausted".to_string())))
    }

    async fn watch_class_prepare(&mut self, class_pattern: &str) -> TargetResult<RequestHandle> {
        self.record(Call::WatchClassPrepare(class_pattern.to_string()))?;
        Ok(self.allocate_request())
    }

    async fn locations_of_line(&mut self, class: ClassHandle, line: u32) -> TargetResult<Vec<Location>> {
        self.record(Call::LocationsOfLine(line))?;
        if class != CALC_CLASS {
            return Err(TargetError::NoSuchElement(format!("class {:x}", class)));
        }
        if self.lines.contains(&line) {
            Ok(vec![location(line)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn enable_breakpoint(&mut self, location: &Location) -> TargetResult<RequestHandle> {
        let line = location.line.unwrap_or_default();
        self.record(Call::EnableBreakpoint(line))?;
        if self.fail_enable {
            return Err(TargetError::Other("breakpoint refused".to_string()));
        }
        let request = self.allocate_request();
        self.breakpoints.insert(request, line);
        Ok(request)
    }

    async fn delete_breakpoint(&mut self, request: RequestHandle) -> TargetResult<()> {
        self.record(Call::DeleteBreakpoint(request))?;
        self.breakpoints
            .remove(&request)
            .map(|_| ())
            .ok_or_else(|| TargetError::NoSuchElement(format!("request {}", request)))
    }

    async fn create_step(
        &mut self,
        thread: ThreadHandle,
        scope: StepScope,
        _class_filter: &str,
    ) -> TargetResult<RequestHandle> {
        self.record(Call::CreateStep(thread, scope))?;
        if self.fail_steps {
            return Err(TargetError::Other("step refused".to_string()));
        }
        if self.steps.values().any(|t| *t == thread) {
            return Err(TargetError::Other("duplicate step on thread".to_string()));
        }
        let request = self.allocate_request();
        self.steps.insert(request, thread);
        Ok(request)
    }

    async fn delete_step(&mut self, request: RequestHandle) -> TargetResult<()> {
        self.record(Call::DeleteStep(request))?;
        self.steps
            .remove(&request)
            .map(|_| ())
            .ok_or_else(|| TargetError::NoSuchElement(format!("request {}", request)))
    }

    async fn resume(&mut self) -> TargetResult<()> {
        self.record(Call::Resume)
    }

    async fn frames(&mut self, _thread: ThreadHandle, max: Option<usize>) -> TargetResult<Vec<StackFrame>> {
        self.record(Call::Frames)?;
        let frames = vec![StackFrame {
            id: 0x100,
            location: location(self.frame_line),
        }];
        Ok(frames.into_iter().take(max.unwrap_or(usize::MAX)).collect())
    }

    async fn visible_variables(
        &mut self,
        _thread: ThreadHandle,
        _frame: &StackFrame,
    ) -> TargetResult<Vec<LocalVariable>> {
        self.record(Call::VisibleVariables)?;
        Ok(self.locals.clone())
    }

    async fn field_value(&mut self, object: &ObjectRef, field: &str) -> TargetResult<Value> {
        self.record(Call::FieldValue(field.to_string()))?;
        self.fields
            .get(&(object.id, field.to_string()))
            .cloned()
            .ok_or_else(|| TargetError::NoSuchElement(format!("field {}", field)))
    }

    async fn array_element(&mut self, array: &ArrayRef, index: usize) -> TargetResult<Value> {
        self.record(Call::ArrayElement(index))?;
        self.arrays
            .get(&array.id)
            .and_then(|values| values.get(index))
            .cloned()
            .ok_or_else(|| TargetError::NoSuchElement(format!("index {}", index)))
    }

    async fn array_values(&mut self, array: &ArrayRef) -> TargetResult<Vec<Value>> {
        self.record(Call::ArrayValues(array.id))?;
        self.arrays
            .get(&array.id)
            .cloned()
            .ok_or_else(|| TargetError::NoSuchElement(format!("array {:x}", array.id)))
    }

    async fn detach(&mut self) -> TargetResult<()> {
        self.record(Call::Detach)
    }
}

/// Console fed from a fixed list of input lines
pub struct ScriptedConsole {
    pub input: VecDeque<String>,
    pub output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(input: &[&str]) -> Self {
        Self {
            input: input.iter().map(|s| s.to_string()).collect(),
            output: Vec::new(),
        }
    }

    pub fn contains(&self, line: &str) -> bool {
        self.output.iter().any(|l| l == line)
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn say(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}
