// EventRequest command implementations
//
// Set up and clear event requests (breakpoints, steps, class prepare)

use crate::commands::{command_sets, event_commands, event_kinds, modifier_kinds};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::read_i32;
use crate::types::{Location, RequestId, ThreadId};
use bytes::BufMut;
use tracing::debug;

/// Suspend policy for events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SuspendPolicy {
    None = 0,
    EventThread = 1,
    All = 2,
}

/// Event request modifiers (filters), applied by the VM in order
#[derive(Debug, Clone)]
pub enum EventModifier {
    Count(i32),
    ThreadOnly(ThreadId),
    ClassMatch(String),
    ClassExclude(String),
    LocationOnly(Location),
    Step {
        thread: ThreadId,
        size: i32,
        depth: i32,
    },
}

impl EventModifier {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            EventModifier::Count(count) => {
                buf.put_u8(modifier_kinds::COUNT);
                buf.put_i32(*count);
            }
            EventModifier::ThreadOnly(thread) => {
                buf.put_u8(modifier_kinds::THREAD_ONLY);
                buf.put_u64(*thread);
            }
            EventModifier::ClassMatch(pattern) => {
                buf.put_u8(modifier_kinds::CLASS_MATCH);
                put_string(buf, pattern);
            }
            EventModifier::ClassExclude(pattern) => {
                buf.put_u8(modifier_kinds::CLASS_EXCLUDE);
                put_string(buf, pattern);
            }
            EventModifier::LocationOnly(location) => {
                buf.put_u8(modifier_kinds::LOCATION_ONLY);
                buf.put_u8(location.type_tag);
                buf.put_u64(location.class_id);
                buf.put_u64(location.method_id);
                buf.put_u64(location.index);
            }
            EventModifier::Step {
                thread,
                size,
                depth,
            } => {
                buf.put_u8(modifier_kinds::STEP);
                buf.put_u64(*thread);
                buf.put_i32(*size);
                buf.put_i32(*depth);
            }
        }
    }
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

/// Encode the body of an EventRequest.Set command
pub fn encode_event_request(
    event_kind: u8,
    suspend_policy: SuspendPolicy,
    modifiers: &[EventModifier],
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u8(event_kind);
    buf.put_u8(suspend_policy as u8);
    buf.put_i32(modifiers.len() as i32);
    for modifier in modifiers {
        modifier.encode(&mut buf);
    }
    buf
}

impl JdwpConnection {
    /// Register an event request (EventRequest.Set command), returning its request ID
    pub async fn set_event_request(
        &mut self,
        event_kind: u8,
        suspend_policy: SuspendPolicy,
        modifiers: &[EventModifier],
    ) -> JdwpResult<RequestId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(id, command_sets::EVENT_REQUEST, event_commands::SET);
        packet.data = encode_event_request(event_kind, suspend_policy, modifiers);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let request_id = read_i32(&mut data)?;

        debug!("Event request kind={} registered as {}", event_kind, request_id);
        Ok(request_id)
    }

    /// Set a breakpoint at an exact location
    pub async fn set_breakpoint(
        &mut self,
        location: &Location,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<RequestId> {
        self.set_event_request(
            event_kinds::BREAKPOINT,
            suspend_policy,
            &[EventModifier::LocationOnly(location.clone())],
        )
        .await
    }

    /// Request a single step on a thread, optionally limited to matching classes
    ///
    /// The count filter of 1 makes the request fire once; the request still has to be
    /// cleared afterwards.
    pub async fn set_step(
        &mut self,
        thread: ThreadId,
        size: i32,
        depth: i32,
        class_pattern: Option<&str>,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<RequestId> {
        let mut modifiers = vec![EventModifier::Step {
            thread,
            size,
            depth,
        }];
        if let Some(pattern) = class_pattern {
            modifiers.push(EventModifier::ClassMatch(pattern.to_string()));
        }
        modifiers.push(EventModifier::Count(1));

        self.set_event_request(event_kinds::SINGLE_STEP, suspend_policy, &modifiers)
            .await
    }

    /// Ask to be notified when classes matching `class_pattern` are prepared
    pub async fn set_class_prepare(
        &mut self,
        class_pattern: &str,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<RequestId> {
        self.set_event_request(
            event_kinds::CLASS_PREPARE,
            suspend_policy,
            &[EventModifier::ClassMatch(class_pattern.to_string())],
        )
        .await
    }

    /// Clear an event request (EventRequest.Clear command)
    pub async fn clear_event_request(&mut self, event_kind: u8, request_id: RequestId) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(id, command_sets::EVENT_REQUEST, event_commands::CLEAR);

        packet.data.put_u8(event_kind);
        packet.data.put_i32(request_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }

    pub async fn clear_breakpoint(&mut self, request_id: RequestId) -> JdwpResult<()> {
        self.clear_event_request(event_kinds::BREAKPOINT, request_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{step_depths, step_sizes};

    #[test]
    fn test_encode_breakpoint_request() {
        let location = Location {
            type_tag: 1,
            class_id: 0x10,
            method_id: 0x20,
            index: 3,
        };

        let body = encode_event_request(
            event_kinds::BREAKPOINT,
            SuspendPolicy::All,
            &[EventModifier::LocationOnly(location)],
        );

        assert_eq!(body[0], event_kinds::BREAKPOINT);
        assert_eq!(body[1], 2);
        assert_eq!(&body[2..6], &[0, 0, 0, 1]);
        assert_eq!(body[6], modifier_kinds::LOCATION_ONLY);
        assert_eq!(body.len(), 6 + 1 + 1 + 8 + 8 + 8);
        assert_eq!(&body[body.len() - 8..], &[0, 0, 0, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn test_encode_step_request_modifier_order() {
        let body = encode_event_request(
            event_kinds::SINGLE_STEP,
            SuspendPolicy::All,
            &[
                EventModifier::Step {
                    thread: 1,
                    size: step_sizes::LINE,
                    depth: step_depths::OVER,
                },
                EventModifier::ClassMatch("Calc".to_string()),
                EventModifier::Count(1),
            ],
        );

        assert_eq!(&body[2..6], &[0, 0, 0, 3]);
        // step modifier: kind + thread + size + depth
        assert_eq!(body[6], modifier_kinds::STEP);
        let class_match_at = 6 + 1 + 8 + 4 + 4;
        assert_eq!(body[class_match_at], modifier_kinds::CLASS_MATCH);
        assert_eq!(&body[class_match_at + 1..class_match_at + 5], &[0, 0, 0, 4]);
        assert_eq!(&body[class_match_at + 5..class_match_at + 9], b"Calc");
        assert_eq!(body[class_match_at + 9], modifier_kinds::COUNT);
        assert_eq!(&body[class_match_at + 10..], &[0, 0, 0, 1]);
    }
}
