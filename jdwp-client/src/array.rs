// ArrayReference command implementations

use crate::commands::{array_reference_commands, command_sets};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_count, read_tag, read_tagged_value, read_untagged_value};
use crate::types::{ArrayId, Value};
use bytes::BufMut;

/// Decode an ArrayRegion: primitive regions carry bare values, object regions tagged ones
pub fn read_array_region(buf: &mut &[u8]) -> JdwpResult<Vec<Value>> {
    let tag = read_tag(buf)?;
    let count = read_count(buf)?;

    (0..count)
        .map(|_| {
            if tag.is_reference() {
                read_tagged_value(buf)
            } else {
                read_untagged_value(tag, buf)
            }
        })
        .collect()
}

impl JdwpConnection {
    /// Number of elements in an array (ArrayReference.Length command)
    pub async fn get_array_length(&mut self, array_id: ArrayId) -> JdwpResult<i32> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::LENGTH,
        );
        packet.data.put_u64(array_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        crate::reader::read_i32(&mut data)
    }

    /// A range of array elements (ArrayReference.GetValues command)
    pub async fn get_array_values(&mut self, array_id: ArrayId, first_index: i32, length: i32) -> JdwpResult<Vec<Value>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::GET_VALUES,
        );
        packet.data.put_u64(array_id);
        packet.data.put_i32(first_index);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_array_region(&mut data)
    }
}
