// JDWP execution controller
//
// Implements `ExecutionControl` over a `JdwpConnection`. Raw JDWP ids are turned into
// named locations and display-ready values here so the session never sees wire types.

use crate::model::{
    ArrayRef, ClassHandle, EventBatch, LocalVariable, Location, ObjectRef, RequestHandle, StackFrame,
    StepScope, TargetEvent, ThreadHandle, Value,
};
use crate::target::{ExecutionControl, TargetError, TargetResult};
use async_trait::async_trait;
use jdwp_client::commands::{event_kinds, step_depths, step_sizes};
use jdwp_client::method::LineTable;
use jdwp_client::protocol::error_codes;
use jdwp_client::reftype::{FieldInfo, MethodInfo};
use jdwp_client::stackframe::VariableSlot;
use jdwp_client::types::{self as wire, TypeTag, ValueData, Variable};
use jdwp_client::{EventKind, EventSet, JdwpConnection, JdwpError, SuspendPolicy};
use std::collections::HashMap;
use tokio::process::Child;
use tracing::{debug, info, trace, warn};

/// Type tag of a class in JDWP locations
const CLASS_TYPE_TAG: u8 = 1;

impl From<JdwpError> for TargetError {
    fn from(e: JdwpError) -> Self {
        if e.is_disconnect() {
            return TargetError::NotAvailable(e.to_string());
        }

        match e.error_code() {
            Some(
                error_codes::NOT_FOUND
                | error_codes::ABSENT_INFORMATION
                | error_codes::INVALID_INDEX
                | error_codes::INVALID_FIELDID
                | error_codes::INVALID_SLOT
                | error_codes::INVALID_OBJECT
                | error_codes::INVALID_LOCATION,
            ) => TargetError::NoSuchElement(e.to_string()),
            _ => TargetError::Other(e.to_string()),
        }
    }
}

/// Keep `Ok` values, turn recoverable failures into `None`; only a lost target propagates
fn tolerate<T>(result: TargetResult<T>, what: &str) -> TargetResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_disconnect() => Err(e),
        Err(e) => {
            debug!("No {}: {}", what, e);
            Ok(None)
        }
    }
}

/// Render a JVM type signature the way Java source spells it
///
/// `I` becomes `int`, `Ljava/lang/String;` becomes `java.lang.String`, `[[I` becomes `int[][]`.
pub fn signature_to_type_name(signature: &str) -> String {
    let element = signature.trim_start_matches('[');
    let dimensions = signature.len() - element.len();

    let base = match element {
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "D" => "double".to_string(),
        "F" => "float".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "S" => "short".to_string(),
        "Z" => "boolean".to_string(),
        "V" => "void".to_string(),
        _ => match element.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
            Some(class) => class.replace('/', "."),
            None => element.to_string(),
        },
    };

    format!("{}{}", base, "[]".repeat(dimensions))
}

pub struct JdwpTarget {
    connection: JdwpConnection,
    /// Present when we launched the JVM ourselves
    child: Option<Child>,
    type_names: HashMap<ClassHandle, String>,
    methods: HashMap<ClassHandle, Vec<MethodInfo>>,
    fields: HashMap<ClassHandle, Vec<FieldInfo>>,
    line_tables: HashMap<(ClassHandle, u64), LineTable>,
    variable_tables: HashMap<(ClassHandle, u64), Vec<Variable>>,
}

impl JdwpTarget {
    pub fn new(connection: JdwpConnection, child: Option<Child>) -> Self {
        Self {
            connection,
            child,
            type_names: HashMap::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
            line_tables: HashMap::new(),
            variable_tables: HashMap::new(),
        }
    }

    async fn type_name(&mut self, class: ClassHandle) -> TargetResult<String> {
        if let Some(name) = self.type_names.get(&class) {
            return Ok(name.clone());
        }

        let signature = self.connection.get_signature(class).await?;
        let name = signature_to_type_name(&signature);
        self.type_names.insert(class, name.clone());
        Ok(name)
    }

    async fn methods(&mut self, class: ClassHandle) -> TargetResult<Vec<MethodInfo>> {
        if let Some(methods) = self.methods.get(&class) {
            return Ok(methods.clone());
        }

        let methods = self.connection.get_methods(class).await?;
        self.methods.insert(class, methods.clone());
        Ok(methods)
    }

    async fn fields(&mut self, class: ClassHandle) -> TargetResult<Vec<FieldInfo>> {
        if let Some(fields) = self.fields.get(&class) {
            return Ok(fields.clone());
        }

        let fields = self.connection.get_fields(class).await?;
        self.fields.insert(class, fields.clone());
        Ok(fields)
    }

    async fn line_table(&mut self, class: ClassHandle, method: u64) -> TargetResult<LineTable> {
        if let Some(table) = self.line_tables.get(&(class, method)) {
            return Ok(table.clone());
        }

        let table = self.connection.get_line_table(class, method).await?;
        self.line_tables.insert((class, method), table.clone());
        Ok(table)
    }

    async fn variable_table(&mut self, class: ClassHandle, method: u64) -> TargetResult<Vec<Variable>> {
        if let Some(table) = self.variable_tables.get(&(class, method)) {
            return Ok(table.clone());
        }

        let table = self.connection.get_variable_table(class, method).await?;
        self.variable_tables.insert((class, method), table.clone());
        Ok(table)
    }

    /// Attach names and the source line to a wire location
    ///
    /// Missing debug information degrades the result instead of failing it.
    async fn describe(&mut self, raw: &wire::Location) -> TargetResult<Location> {
        let class_name = tolerate(self.type_name(raw.class_id).await, "class name")?
            .unwrap_or_else(|| format!("{:x}", raw.class_id));

        let method_name = tolerate(self.methods(raw.class_id).await, "method list")?
            .and_then(|methods| {
                methods
                    .into_iter()
                    .find(|m| m.method_id == raw.method_id)
                    .map(|m| m.name)
            })
            .unwrap_or_else(|| format!("{:x}", raw.method_id));

        let line = tolerate(self.line_table(raw.class_id, raw.method_id).await, "line table")?
            .and_then(|table| table.line_for_index(raw.index))
            .and_then(|line| u32::try_from(line).ok());

        Ok(Location {
            class: raw.class_id,
            class_name,
            method: raw.method_id,
            method_name,
            line,
            code_index: raw.index,
        })
    }

    fn to_wire(location: &Location) -> wire::Location {
        wire::Location {
            type_tag: CLASS_TYPE_TAG,
            class_id: location.class,
            method_id: location.method,
            index: location.code_index,
        }
    }

    /// Snapshot a wire value; strings are read eagerly, arrays get their length
    async fn convert(&mut self, value: &wire::Value) -> TargetResult<Value> {
        Ok(match value.data {
            ValueData::Byte(v) => Value::Int(v.into()),
            ValueData::Short(v) => Value::Int(v.into()),
            ValueData::Int(v) => Value::Int(v.into()),
            ValueData::Long(v) => Value::Int(v),
            ValueData::Float(v) => Value::Float(v.into()),
            ValueData::Double(v) => Value::Float(v),
            ValueData::Boolean(v) => Value::Bool(v),
            ValueData::Char(v) => {
                Value::Char(char::from_u32(v.into()).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            ValueData::Void | ValueData::Object(0) => Value::None,
            ValueData::Object(id) => match value.tag {
                TypeTag::String => Value::Str(self.connection.get_string_value(id).await?),
                TypeTag::Array => {
                    let type_id = self.connection.get_object_reference_type(id).await?;
                    let array_type = self.type_name(type_id).await?;
                    let element_type = array_type
                        .strip_suffix("[]")
                        .unwrap_or(&array_type)
                        .to_string();
                    let length = self.connection.get_array_length(id).await?;

                    Value::Array(ArrayRef {
                        id,
                        element_type,
                        length: usize::try_from(length).unwrap_or_default(),
                    })
                }
                _ => {
                    let type_id = self.connection.get_object_reference_type(id).await?;
                    Value::Object(ObjectRef {
                        id,
                        type_id,
                        type_name: self.type_name(type_id).await?,
                    })
                }
            },
        })
    }

    async fn convert_event(&mut self, details: EventKind, request: RequestHandle) -> TargetResult<TargetEvent> {
        Ok(match details {
            EventKind::ClassPrepare {
                thread,
                ref_type,
                signature,
                ..
            } => {
                let class_name = signature_to_type_name(&signature);
                self.type_names.insert(ref_type, class_name.clone());
                TargetEvent::ClassPrepared {
                    thread,
                    class: ref_type,
                    class_name,
                }
            }
            EventKind::Breakpoint { thread, location } => TargetEvent::BreakpointHit {
                request,
                thread,
                location: self.describe(&location).await?,
            },
            EventKind::Step { thread, location } => TargetEvent::StepCompleted {
                request,
                thread,
                location: self.describe(&location).await?,
            },
            EventKind::VMDeath => TargetEvent::Disconnected,
            _ => TargetEvent::Other,
        })
    }
}

fn trace_event_set(set: &EventSet) {
    if tracing::enabled!(tracing::Level::TRACE) {
        match serde_json::to_string(set) {
            Ok(json) => trace!("Event set: {}", json),
            Err(e) => trace!("Event set not serializable: {}", e),
        }
    }
}

#[async_trait]
impl ExecutionControl for JdwpTarget {
    async fn next_events(&mut self) -> TargetResult<EventBatch> {
        let set = self
            .connection
            .recv_event()
            .await
            .ok_or_else(|| TargetError::NotAvailable("event channel closed".to_string()))?;

        trace_event_set(&set);

        let suspended = set.suspends();
        let mut events = Vec::with_capacity(set.events.len());
        for event in set.events {
            match self.convert_event(event.details, event.request_id).await {
                Ok(converted) => events.push(converted),
                Err(e) if e.is_disconnect() => return Err(e),
                // the set stays suspended, so it must still reach the session
                Err(e) => {
                    warn!("Cannot convert event for request {}: {}", event.request_id, e);
                    events.push(TargetEvent::Other);
                }
            }
        }

        Ok(EventBatch { suspended, events })
    }

    async fn watch_class_prepare(&mut self, class_pattern: &str) -> TargetResult<RequestHandle> {
        Ok(self
            .connection
            .set_class_prepare(class_pattern, SuspendPolicy::All)
            .await?)
    }

    async fn locations_of_line(&mut self, class: ClassHandle, line: u32) -> TargetResult<Vec<Location>> {
        let wanted = i32::try_from(line)
            .map_err(|_| TargetError::NoSuchElement(format!("line {}", line)))?;

        let mut locations = Vec::new();
        for method in self.methods(class).await? {
            // abstract and native methods have no line table
            let Some(table) = tolerate(self.line_table(class, method.method_id).await, "line table")? else {
                continue;
            };

            if let Some(index) = table.first_index_of_line(wanted) {
                let raw = wire::Location {
                    type_tag: CLASS_TYPE_TAG,
                    class_id: class,
                    method_id: method.method_id,
                    index,
                };
                locations.push(self.describe(&raw).await?);
            }
        }

        if locations.is_empty() {
            return Err(TargetError::NoSuchElement(format!("no code at line {}", line)));
        }

        locations.sort_by_key(|l| l.code_index);
        Ok(locations)
    }

    async fn enable_breakpoint(&mut self, location: &Location) -> TargetResult<RequestHandle> {
        let request = self
            .connection
            .set_breakpoint(&Self::to_wire(location), SuspendPolicy::All)
            .await?;
        info!("Breakpoint {} enabled at {}", request, location);
        Ok(request)
    }

    async fn delete_breakpoint(&mut self, request: RequestHandle) -> TargetResult<()> {
        Ok(self.connection.clear_breakpoint(request).await?)
    }

    async fn create_step(
        &mut self,
        thread: ThreadHandle,
        scope: StepScope,
        class_filter: &str,
    ) -> TargetResult<RequestHandle> {
        let depth = match scope {
            StepScope::Over => step_depths::OVER,
            StepScope::Into => step_depths::INTO,
        };

        let request = self
            .connection
            .set_step(thread, step_sizes::LINE, depth, Some(class_filter), SuspendPolicy::All)
            .await?;
        debug!("Step request {} ({:?}) on thread {:x}", request, scope, thread);
        Ok(request)
    }

    async fn delete_step(&mut self, request: RequestHandle) -> TargetResult<()> {
        Ok(self
            .connection
            .clear_event_request(event_kinds::SINGLE_STEP, request)
            .await?)
    }

    async fn resume(&mut self) -> TargetResult<()> {
        Ok(self.connection.resume_all().await?)
    }

    async fn frames(&mut self, thread: ThreadHandle, max: Option<usize>) -> TargetResult<Vec<StackFrame>> {
        // asking for more frames than exist is an error on the wire, so fetch all
        let raw_frames = self.connection.get_frames(thread, 0, -1).await?;

        let mut frames = Vec::new();
        for raw in raw_frames.into_iter().take(max.unwrap_or(usize::MAX)) {
            frames.push(StackFrame {
                id: raw.frame_id,
                location: self.describe(&raw.location).await?,
            });
        }
        Ok(frames)
    }

    async fn visible_variables(
        &mut self,
        thread: ThreadHandle,
        frame: &StackFrame,
    ) -> TargetResult<Vec<LocalVariable>> {
        let location = &frame.location;
        let visible: Vec<Variable> = self
            .variable_table(location.class, location.method)
            .await?
            .into_iter()
            .filter(|v| v.is_visible_at(location.code_index))
            .collect();

        if visible.is_empty() {
            return Ok(Vec::new());
        }

        let slots: Vec<VariableSlot> = visible
            .iter()
            .map(|v| VariableSlot {
                slot: v.slot as i32,
                sig_byte: v.signature.bytes().next().unwrap_or(b'L'),
            })
            .collect();

        let values = self
            .connection
            .get_frame_values(thread, frame.id, &slots)
            .await?;

        let mut variables = Vec::with_capacity(visible.len());
        for (variable, raw) in visible.into_iter().zip(values.iter()) {
            variables.push(LocalVariable {
                declared_type: signature_to_type_name(&variable.signature),
                name: variable.name,
                value: self.convert(raw).await?,
            });
        }
        Ok(variables)
    }

    async fn field_value(&mut self, object: &ObjectRef, field: &str) -> TargetResult<Value> {
        let mut class = Some(object.type_id);

        while let Some(current) = class {
            let found = self
                .fields(current)
                .await?
                .into_iter()
                .find(|f| f.name == field);

            if let Some(info) = found {
                let values = if info.is_static() {
                    self.connection.get_static_values(current, &[info.field_id]).await?
                } else {
                    self.connection.get_object_values(object.id, &[info.field_id]).await?
                };

                let raw = values
                    .first()
                    .ok_or_else(|| TargetError::Other(format!("no value returned for {}", field)))?;
                return self.convert(raw).await;
            }

            class = self.connection.get_superclass(current).await?;
        }

        Err(TargetError::NoSuchElement(format!(
            "field {} in {}",
            field, object.type_name
        )))
    }

    async fn array_element(&mut self, array: &ArrayRef, index: usize) -> TargetResult<Value> {
        let first = i32::try_from(index)
            .map_err(|_| TargetError::NoSuchElement(format!("index {}", index)))?;

        let values = self.connection.get_array_values(array.id, first, 1).await?;
        let raw = values
            .first()
            .ok_or_else(|| TargetError::NoSuchElement(format!("index {}", index)))?;
        self.convert(raw).await
    }

    async fn array_values(&mut self, array: &ArrayRef) -> TargetResult<Vec<Value>> {
        if array.length == 0 {
            return Ok(Vec::new());
        }

        let length = i32::try_from(array.length)
            .map_err(|_| TargetError::Other(format!("array {:x} too long", array.id)))?;

        let raw = self.connection.get_array_values(array.id, 0, length).await?;
        let mut values = Vec::with_capacity(raw.len());
        for value in &raw {
            values.push(self.convert(value).await?);
        }
        Ok(values)
    }

    async fn detach(&mut self) -> TargetResult<()> {
        match self.child.as_mut() {
            Some(child) => {
                info!("Killing launched JVM");
                child
                    .start_kill()
                    .map_err(|e| TargetError::Other(format!("failed to kill JVM: {}", e)))
            }
            None => {
                info!("Disposing of attached VM");
                match self.connection.dispose().await {
                    Err(e) if e.is_disconnect() => {
                        warn!("VM already gone while disposing: {}", e);
                        Ok(())
                    }
                    other => Ok(other?),
                }
            }
        }
    }
}
