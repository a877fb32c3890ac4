// Command interpreter
//
// Reads one operator line at a time while the target is halted. Only `r`, `n`, `ni`
// and `e` give control back to the event loop; everything else loops. Operator-input
// errors are reported inline and never leave this module.

use crate::console::Console;
use crate::error::CommandError;
use crate::model::{LocalVariable, StackFrame, StepScope, ThreadHandle, Value};
use crate::session::{ActiveStep, HaltContext, Session};
use crate::target::{ExecutionControl, TargetError};
use tracing::{debug, warn};

pub const HELP: &[&str] = &[
    "Press h for help",
    "Press e for exit",
    "Press r for run",
    "Press n to step over the current line",
    "Write ni to step into the current line",
    "Press b for setting a breakpoint",
    "Write db to delete a breakpoint",
    "Write sb to show the breakpoints",
    "Write sf to print the current stack frame",
    "Write st to print the current stack trace",
    "Press p for printing a object value or an array element",
];

const RULE: &str = "===========================";

/// How the interpreter handed control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yield {
    Resumed,
    Stepped,
    /// Leave without resuming
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Resume,
    StepOver,
    StepInto,
    SetBreakpoint,
    DeleteBreakpoint,
    ShowBreakpoints,
    ShowFrame,
    ShowStack,
    Print,
    Help,
    Exit,
}

impl Command {
    /// Exact, case-sensitive token match; surrounding whitespace is ignored
    pub fn parse(input: &str) -> Option<Self> {
        Some(match input.trim() {
            "r" => Command::Resume,
            "n" => Command::StepOver,
            "ni" => Command::StepInto,
            "b" => Command::SetBreakpoint,
            "db" => Command::DeleteBreakpoint,
            "sb" => Command::ShowBreakpoints,
            "sf" => Command::ShowFrame,
            "st" => Command::ShowStack,
            "p" => Command::Print,
            "h" => Command::Help,
            "e" => Command::Exit,
            _ => return None,
        })
    }
}

impl<T, C> Session<T, C>
where
    T: ExecutionControl,
    C: Console,
{
    /// Run commands until one yields control. `Err` only when the target is gone.
    pub async fn interpret(&mut self) -> Result<Yield, TargetError> {
        loop {
            let Some(line) = self.console.read_line().await else {
                debug!("Operator input closed");
                return Ok(Yield::Exited);
            };

            let Some(command) = Command::parse(&line) else {
                continue;
            };

            match self.execute(command).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    return match e {
                        CommandError::Target(e) => Err(e),
                        _ => Ok(Yield::Exited),
                    };
                }
                Err(e) => self.console.say(&e.to_string()),
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Option<Yield>, CommandError> {
        match command {
            Command::Resume => return Ok(Some(Yield::Resumed)),
            Command::Exit => return Ok(Some(Yield::Exited)),
            Command::StepOver => {
                self.request_step(StepScope::Over).await?;
                return Ok(Some(Yield::Stepped));
            }
            Command::StepInto => {
                self.request_step(StepScope::Into).await?;
                return Ok(Some(Yield::Stepped));
            }
            Command::SetBreakpoint => self.set_breakpoint().await?,
            Command::DeleteBreakpoint => self.delete_breakpoint().await?,
            Command::ShowBreakpoints => self.show_breakpoints(),
            Command::ShowFrame => self.show_frame().await?,
            Command::ShowStack => self.show_stack().await?,
            Command::Print => self.print_element().await?,
            Command::Help => {
                for line in HELP {
                    self.console.say(line);
                }
            }
        }

        Ok(None)
    }

    fn halt_context(&self) -> Result<HaltContext, CommandError> {
        self.context.ok_or(CommandError::NoContext)
    }

    async fn prompt(&mut self, question: &str) -> Result<String, CommandError> {
        self.console.say(question);
        self.console
            .read_line()
            .await
            .map(|line| line.trim().to_string())
            .ok_or(CommandError::InputClosed)
    }

    async fn prompt_line_number(&mut self) -> Result<u32, CommandError> {
        let answer = self.prompt("Enter the line for the breakpoint: ").await?;
        answer
            .parse()
            .map_err(|_| CommandError::MalformedNumericInput(answer))
    }

    /// Register a step on the halted thread, replacing any step still outstanding
    async fn request_step(&mut self, scope: StepScope) -> Result<(), CommandError> {
        let context = self.halt_context()?;

        if let Some(previous) = self.step.take() {
            match self.target.delete_step(previous.request).await {
                Ok(()) | Err(TargetError::NoSuchElement(_)) => {
                    debug!("Replaced step request {}", previous.request)
                }
                Err(e) => {
                    self.step = Some(previous);
                    return Err(e.into());
                }
            }
        }

        let request = self
            .target
            .create_step(context.thread, scope, &self.entry_class)
            .await?;

        self.step = Some(ActiveStep {
            request,
            thread: context.thread,
            scope,
        });
        Ok(())
    }

    async fn set_breakpoint(&mut self) -> Result<(), CommandError> {
        let context = self.halt_context()?;
        let line = self.prompt_line_number().await?;

        self.breakpoints
            .set(&mut self.target, context.class, line)
            .await?;

        self.console.say(&format!("Breakpoint set at line {}", line));
        Ok(())
    }

    async fn delete_breakpoint(&mut self) -> Result<(), CommandError> {
        let line = self.prompt_line_number().await?;

        if self.breakpoints.delete(&mut self.target, line).await? {
            self.console.say(&format!("Breakpoint at line {} deleted", line));
        } else {
            self.console.say(&format!("No breakpoint at line {}", line));
        }
        Ok(())
    }

    fn show_breakpoints(&mut self) {
        if self.breakpoints.is_empty() {
            self.console.say("No breakpoints set");
            return;
        }

        let lines: Vec<String> = self
            .breakpoints
            .list()
            .map(|bp| format!("{} in method {}", bp.location, bp.location.qualified_method()))
            .collect();

        for line in lines {
            self.console.say(&line);
        }
    }

    async fn top_frame(&mut self, thread: ThreadHandle) -> Result<StackFrame, TargetError> {
        self.target
            .frames(thread, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TargetError::NoSuchElement("thread has no frames".to_string()))
    }

    /// Fresh read of the top frame's locals; never cached across a resume
    pub(crate) async fn frame_variables(&mut self, thread: ThreadHandle) -> Result<Vec<LocalVariable>, TargetError> {
        let frame = self.top_frame(thread).await?;
        self.target.visible_variables(thread, &frame).await
    }

    /// Operator-facing text of a value; arrays are expanded element by element
    ///
    /// An array whose elements cannot be read falls back to its compact form.
    pub(crate) async fn render(&mut self, value: &Value) -> Result<String, TargetError> {
        let Value::Array(array) = value else {
            return Ok(value.to_string());
        };

        match self.target.array_values(array).await {
            Ok(elements) => {
                let elements: Vec<String> = elements.iter().map(Value::to_string).collect();
                Ok(format!("[{}]", elements.join(", ")))
            }
            Err(e) if e.is_disconnect() => Err(e),
            Err(e) => {
                warn!("Cannot read elements of {}: {}", value, e);
                Ok(value.to_string())
            }
        }
    }

    /// `name: type = value`, with arrays expanded
    pub(crate) async fn render_variable(&mut self, variable: &LocalVariable) -> Result<String, TargetError> {
        let value = self.render(&variable.value).await?;
        Ok(format!("{}: {} = {}", variable.name, variable.declared_type, value))
    }

    async fn show_frame(&mut self) -> Result<(), CommandError> {
        let context = self.halt_context()?;
        let variables = self.frame_variables(context.thread).await?;

        self.console.say("====current stack frame====");
        for variable in &variables {
            let line = self.render_variable(variable).await?;
            self.console.say(&line);
        }
        self.console.say(RULE);
        Ok(())
    }

    async fn show_stack(&mut self) -> Result<(), CommandError> {
        let context = self.halt_context()?;
        let frames = self.target.frames(context.thread, None).await?;

        self.console.say("====current stack trace====");
        for frame in frames {
            self.console.say(&format!(
                "{}: {}",
                frame.location.method_name,
                frame.location.line_display()
            ));
        }
        self.console.say(RULE);
        Ok(())
    }

    /// `p`: print a local; arrays ask for an index, objects for a field
    async fn print_element(&mut self) -> Result<(), CommandError> {
        let context = self.halt_context()?;
        let name = self.prompt("Insert variable name to print").await?;

        let variable = self
            .frame_variables(context.thread)
            .await?
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| CommandError::NoSuchVariable(name.clone()))?;

        match variable.value {
            Value::Array(array) => {
                let answer = self.prompt("Which index of the array should be printed?").await?;
                let index: i64 = answer
                    .parse()
                    .map_err(|_| CommandError::MalformedNumericInput(answer.clone()))?;

                let in_bounds = usize::try_from(index).ok().filter(|i| *i < array.length);
                let Some(position) = in_bounds else {
                    return Err(CommandError::IndexOutOfRange {
                        index,
                        length: array.length,
                    });
                };

                let element = self.target.array_element(&array, position).await?;
                self.console.say(&format!("{}[{}]: {}", name, position, element));
            }
            Value::Object(object) => {
                let field = self.prompt("Which field should be printed?").await?;
                let value = match self.target.field_value(&object, &field).await {
                    Ok(value) => value,
                    Err(TargetError::NoSuchElement(reason)) => {
                        warn!("Field lookup failed: {}", reason);
                        return Err(CommandError::NoSuchField(field));
                    }
                    Err(e) => return Err(e.into()),
                };
                let value = self.render(&value).await?;
                self.console.say(&format!("{}.{}: {}", name, field, value));
            }
            value => self.console.say(&format!("{}: {}", name, value)),
        }

        Ok(())
    }
}
