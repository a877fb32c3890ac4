// ThreadReference command implementations

use crate::commands::{command_sets, thread_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{bounded_capacity, read_count, read_location, read_u64};
use crate::types::{FrameId, Location, ThreadId};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Stack frame information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub frame_id: FrameId,
    pub location: Location,
}

impl JdwpConnection {
    /// Get stack frames of a suspended thread (ThreadReference.Frames command)
    /// `length` of -1 means all frames from `start_frame`
    pub async fn get_frames(
        &mut self,
        thread_id: ThreadId,
        start_frame: i32,
        length: i32,
    ) -> JdwpResult<Vec<Frame>> {
        let mut packet = CommandPacket::new(self.next_id(), command_sets::THREAD_REFERENCE, thread_commands::FRAMES);

        packet.data.put_u64(thread_id);
        packet.data.put_i32(start_frame);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_count(&mut data)?;
        let mut frames = Vec::with_capacity(bounded_capacity(count, data, 25));

        for _ in 0..count {
            frames.push(Frame {
                frame_id: read_u64(&mut data)?,
                location: read_location(&mut data)?,
            });
        }

        Ok(frames)
    }
}
