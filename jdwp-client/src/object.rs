// ObjectReference command implementations

use crate::commands::{command_sets, object_reference_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_count, read_tagged_value, read_u64, read_u8};
use crate::types::{FieldId, ObjectId, ReferenceTypeId, Value};
use bytes::BufMut;

impl JdwpConnection {
    /// Runtime type of an object (ObjectReference.ReferenceType command)
    pub async fn get_object_reference_type(&mut self, object_id: ObjectId) -> JdwpResult<ReferenceTypeId> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::REFERENCE_TYPE,
        );
        packet.data.put_u64(object_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let _type_tag = read_u8(&mut data)?;
        read_u64(&mut data)
    }

    /// Instance field values of an object (ObjectReference.GetValues command)
    pub async fn get_object_values(&mut self, object_id: ObjectId, field_ids: &[FieldId]) -> JdwpResult<Vec<Value>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::GET_VALUES,
        );

        packet.data.put_u64(object_id);
        packet.data.put_i32(field_ids.len() as i32);
        for field_id in field_ids {
            packet.data.put_u64(*field_id);
        }

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_count(&mut data)?;
        (0..count).map(|_| read_tagged_value(&mut data)).collect()
    }
}
