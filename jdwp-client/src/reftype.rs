// ReferenceType and ClassType command implementations
//
// Methods, fields and static values of classes, plus superclass lookup

use crate::commands::{class_type_commands, command_sets, modifier_bits, reference_type_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{bounded_capacity, read_count, read_i32, read_string, read_tagged_value, read_u64};
use crate::types::{ClassId, FieldId, MethodId, ReferenceTypeId, Value};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Method information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub method_id: MethodId,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

/// Field information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_id: FieldId,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.mod_bits & modifier_bits::STATIC != 0
    }
}

impl JdwpConnection {
    /// JVM signature of a type (ReferenceType.Signature command)
    pub async fn get_signature(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<String> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::REFERENCE_TYPE,
            reference_type_commands::SIGNATURE,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }

    /// Methods declared by a type (ReferenceType.Methods command)
    pub async fn get_methods(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<Vec<MethodInfo>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::REFERENCE_TYPE,
            reference_type_commands::METHODS,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_count(&mut data)?;
        let mut methods = Vec::with_capacity(bounded_capacity(count, data, 20));

        for _ in 0..count {
            methods.push(MethodInfo {
                method_id: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                mod_bits: read_i32(&mut data)?,
            });
        }

        Ok(methods)
    }

    /// Fields declared by a type, not including inherited ones (ReferenceType.Fields command)
    pub async fn get_fields(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<Vec<FieldInfo>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::REFERENCE_TYPE,
            reference_type_commands::FIELDS,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_count(&mut data)?;
        let mut fields = Vec::with_capacity(bounded_capacity(count, data, 20));

        for _ in 0..count {
            fields.push(FieldInfo {
                field_id: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                mod_bits: read_i32(&mut data)?,
            });
        }

        Ok(fields)
    }

    /// Values of static fields (ReferenceType.GetValues command)
    pub async fn get_static_values(
        &mut self,
        ref_type_id: ReferenceTypeId,
        field_ids: &[FieldId],
    ) -> JdwpResult<Vec<Value>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::REFERENCE_TYPE,
            reference_type_commands::GET_VALUES,
        );
        packet.data.put_u64(ref_type_id);
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

    /// Direct superclass of a class, `None` for java.lang.Object (ClassType.Superclass)
    pub async fn get_superclass(&mut self, class_id: ClassId) -> JdwpResult<Option<ClassId>> {
        let mut packet = CommandPacket::new(
            self.next_id(),
            command_sets::CLASS_TYPE,
            class_type_commands::SUPERCLASS,
        );
        packet.data.put_u64(class_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let superclass = read_u64(&mut data)?;

        Ok((superclass != 0).then_some(superclass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_static_bit() {
        let mut field = FieldInfo {
            field_id: 1,
            name: "count".to_string(),
            signature: "I".to_string(),
            mod_bits: 0x0001,
        };
        assert!(!field.is_static());

        field.mod_bits |= modifier_bits::STATIC;
        assert!(field.is_static());
    }
}
