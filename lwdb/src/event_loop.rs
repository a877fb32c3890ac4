// Event loop
//
// Blocks on the target's event sets, reacts to each event in arrival order and hands
// control to the command interpreter on halts. A set that suspended the target is
// resumed exactly once, after the interpreter has yielded.

use crate::console::Console;
use crate::interpreter::Yield;
use crate::model::{EventBatch, Location, TargetEvent, ThreadHandle};
use crate::session::{HaltContext, Session, SessionEnd};
use crate::target::{ExecutionControl, TargetError};
use tracing::{debug, error, info, warn};

impl<T, C> Session<T, C>
where
    T: ExecutionControl,
    C: Console,
{
    /// Drain events until the target disconnects or the operator exits
    pub async fn run(&mut self) -> SessionEnd {
        loop {
            let batch = match self.target.next_events().await {
                Ok(batch) => batch,
                Err(e) if e.is_disconnect() => return self.connection_lost(&e),
                Err(e) => {
                    error!("Failed to receive events: {}", e);
                    self.console.say(&format!("error while waiting for events: {}", e));
                    continue;
                }
            };

            if let Some(end) = self.dispatch_batch(batch).await {
                return end;
            }
        }
    }

    async fn dispatch_batch(&mut self, batch: EventBatch) -> Option<SessionEnd> {
        debug!("Dispatching {} event(s), suspended={}", batch.events.len(), batch.suspended);

        let mut operator_consulted = false;

        for event in batch.events {
            match self.dispatch(event, &mut operator_consulted).await {
                Ok(None) => {}
                Ok(Some(end)) => return Some(end),
                Err(e) if e.is_disconnect() => return Some(self.connection_lost(&e)),
                Err(e) => {
                    // One bad event must not take the session down
                    error!("Failed to handle event: {}", e);
                    self.console.say(&format!("error while handling event: {}", e));
                }
            }
        }

        if batch.suspended {
            if let Err(e) = self.target.resume().await {
                if e.is_disconnect() {
                    return Some(self.connection_lost(&e));
                }
                error!("Failed to resume target: {}", e);
                self.console.say(&format!("error while resuming: {}", e));
            }
        }

        None
    }

    async fn dispatch(
        &mut self,
        event: TargetEvent,
        operator_consulted: &mut bool,
    ) -> Result<Option<SessionEnd>, TargetError> {
        match event {
            TargetEvent::ClassPrepared {
                thread,
                class,
                class_name,
            } => {
                info!("Class {} prepared", class_name);
                self.context = Some(HaltContext { thread, class });
                self.console.say(&format!("{} loaded", class_name));
                self.consult_operator(operator_consulted).await
            }

            TargetEvent::BreakpointHit {
                thread, location, ..
            } => {
                self.context = Some(HaltContext {
                    thread,
                    class: location.class,
                });
                self.console.say(&format!(
                    "breakpoint at {} in {}",
                    location.line_display(),
                    location.qualified_method()
                ));
                self.print_halt_variables(thread).await?;
                self.consult_operator(operator_consulted).await
            }

            TargetEvent::StepCompleted {
                request,
                thread,
                location,
            } => {
                self.context = Some(HaltContext {
                    thread,
                    class: location.class,
                });
                self.console.say(&step_halt_line(&location));
                self.print_halt_variables(thread).await?;
                self.retire_step(request).await?;
                self.consult_operator(operator_consulted).await
            }

            TargetEvent::Disconnected => {
                self.console.say("VM is now disconnected.");
                self.abandon_requests();
                Ok(Some(SessionEnd::Disconnected))
            }

            TargetEvent::Other => Ok(None),
        }
    }

    /// Enter the interpreter, at most once per event set
    async fn consult_operator(&mut self, operator_consulted: &mut bool) -> Result<Option<SessionEnd>, TargetError> {
        if *operator_consulted {
            return Ok(None);
        }
        *operator_consulted = true;

        match self.interpret().await? {
            Yield::Resumed | Yield::Stepped => Ok(None),
            Yield::Exited => Ok(Some(SessionEnd::OperatorExit)),
        }
    }

    /// Delete a step request whose completion was just observed
    async fn retire_step(&mut self, request: i32) -> Result<(), TargetError> {
        match self.target.delete_step(request).await {
            Ok(()) => {}
            Err(TargetError::NoSuchElement(reason)) => {
                warn!("Step request {} already gone: {}", request, reason)
            }
            Err(e) => return Err(e),
        }

        if self.step.map(|s| s.request) == Some(request) {
            self.step = None;
        }
        Ok(())
    }

    /// Print the top frame's locals; failures are reported, not propagated, unless the
    /// target is gone
    async fn print_halt_variables(&mut self, thread: ThreadHandle) -> Result<(), TargetError> {
        match self.frame_variables(thread).await {
            Ok(variables) => {
                for variable in &variables {
                    let line = self.render_variable(variable).await?;
                    self.console.say(&line);
                }
                Ok(())
            }
            Err(e) if e.is_disconnect() => Err(e),
            Err(e) => {
                warn!("Cannot read variables: {}", e);
                self.console.say(&format!("cannot read variables: {}", e));
                Ok(())
            }
        }
    }

    fn connection_lost(&mut self, error: &TargetError) -> SessionEnd {
        warn!("Target connection lost: {}", error);
        self.console.say("VM unexpectedly disconnected.");
        self.abandon_requests();
        SessionEnd::ConnectionLost
    }
}

fn step_halt_line(location: &Location) -> String {
    format!(
        "step halted in {} at {}, {}",
        location.method_name,
        location.line_display(),
        location.code_index
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrayRef, StepScope, Value};
    use crate::testing::{
        breakpoint_hit, class_prepared, step_completed, Call, FakeTarget, ScriptedConsole, MAIN_THREAD,
    };

    fn session(target: FakeTarget, input: &[&str]) -> Session<FakeTarget, ScriptedConsole> {
        Session::new(target, ScriptedConsole::new(input), "Calc")
    }

    #[tokio::test]
    async fn test_breakpoint_halt_prints_location_and_variables() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![breakpoint_hit(1, 5)]);
        target.push_disconnect();

        let mut session = session(target, &["sf", "p", "x", "r"]);
        assert_eq!(session.run().await, SessionEnd::Disconnected);

        let out = &session.console.output;
        assert_eq!(out[0], "breakpoint at 5 in Calc.main");
        assert_eq!(out[1], "x: int = 3");
        assert!(session.console.contains("====current stack frame===="));
        assert!(session.console.contains("x: 3"));
        assert!(!session.console.contains("Which index of the array should be printed?"));
        assert!(!session.console.contains("Which field should be printed?"));

        // resumed once for the halt, then blocked for the next set
        let resumes = session.target.calls.iter().filter(|c| **c == Call::Resume).count();
        assert_eq!(resumes, 1);
        let resume_at = session.target.calls.iter().position(|c| *c == Call::Resume).unwrap();
        assert_eq!(session.target.calls[resume_at + 1], Call::NextEvents);
    }

    #[tokio::test]
    async fn test_halt_output_expands_arrays() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.add_local(
            "arr",
            "int[]",
            Value::Array(ArrayRef {
                id: 0x20,
                element_type: "int".to_string(),
                length: 2,
            }),
        );
        target.arrays.insert(0x20, vec![Value::Int(4), Value::Int(5)]);
        target.push_batch(vec![breakpoint_hit(1, 5)]);
        target.push_disconnect();

        let mut session = session(target, &["r"]);
        session.run().await;

        assert_eq!(session.console.output[1], "x: int = 3");
        assert_eq!(session.console.output[2], "arr: int[] = [4, 5]");
    }

    #[tokio::test]
    async fn test_disconnect_event_ends_loop_once() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![TargetEvent::Disconnected, TargetEvent::Other]);

        let mut session = session(target, &[]);
        assert_eq!(session.run().await, SessionEnd::Disconnected);

        let notices = session
            .console
            .output
            .iter()
            .filter(|l| l.as_str() == "VM is now disconnected.")
            .count();
        assert_eq!(notices, 1);
        assert_eq!(session.target.calls, vec![Call::NextEvents]);
    }

    #[tokio::test]
    async fn test_lost_connection_is_clean_termination() {
        let target = FakeTarget::with_lines(&[5]);

        let mut session = session(target, &[]);
        assert_eq!(session.run().await, SessionEnd::ConnectionLost);
        assert!(session.console.contains("VM unexpectedly disconnected."));
    }

    #[tokio::test]
    async fn test_other_events_resume_suspended_set() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![TargetEvent::Other]);
        target.push_disconnect();

        let mut session = session(target, &[]);
        session.run().await;

        assert_eq!(
            session.target.calls,
            vec![Call::NextEvents, Call::Resume, Call::NextEvents]
        );
    }

    #[tokio::test]
    async fn test_class_prepared_sets_context_and_consults_operator() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![class_prepared()]);
        target.push_disconnect();

        let mut session = session(target, &["b", "5", "r"]);
        session.run().await;

        assert!(session.console.contains("Calc loaded"));
        assert!(session.console.contains("Breakpoint set at line 5"));
        assert!(session.target.calls.contains(&Call::EnableBreakpoint(5)));
    }

    #[tokio::test]
    async fn test_step_completion_retires_request() {
        let mut target = FakeTarget::with_lines(&[5, 6]);
        target.push_batch(vec![breakpoint_hit(1, 5)]);
        // request ids: the step created below is request 1 in the fake
        target.push_batch(vec![step_completed(1, 6)]);
        target.push_disconnect();

        let mut session = session(target, &["n", "r"]);
        session.run().await;

        assert!(session.target.calls.contains(&Call::CreateStep(MAIN_THREAD, StepScope::Over)));
        assert!(session.target.calls.contains(&Call::DeleteStep(1)));
        assert!(session.target.live_steps().is_empty());
        assert!(session.active_step().is_none());
        assert!(session.console.contains("step halted in main at 6, 6"));
    }

    #[tokio::test]
    async fn test_failing_event_does_not_abort_session() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_error(TargetError::Other("garbled event".to_string()));
        target.push_batch(vec![breakpoint_hit(1, 5)]);
        target.push_disconnect();

        let mut session = session(target, &["r"]);
        assert_eq!(session.run().await, SessionEnd::Disconnected);
        assert!(session.console.contains("error while waiting for events: target error: garbled event"));
        assert!(session.console.contains("breakpoint at 5 in Calc.main"));
    }

    #[tokio::test]
    async fn test_only_first_halt_in_a_set_consults_operator() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![breakpoint_hit(1, 5), breakpoint_hit(2, 5)]);
        target.push_disconnect();

        // a second interpreter round would consume "h"
        let mut session = session(target, &["r", "h"]);
        session.run().await;

        let halts = session
            .console
            .output
            .iter()
            .filter(|l| l.starts_with("breakpoint at"))
            .count();
        assert_eq!(halts, 2);
        assert!(!session.console.contains("Press h for help"));
    }

    #[tokio::test]
    async fn test_operator_exit_does_not_resume() {
        let mut target = FakeTarget::with_lines(&[5]);
        target.push_batch(vec![breakpoint_hit(1, 5)]);

        let mut session = session(target, &["e"]);
        assert_eq!(session.run().await, SessionEnd::OperatorExit);
        assert!(!session.target.calls.contains(&Call::Resume));
    }
}
