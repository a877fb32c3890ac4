// Method command implementations
//
// Line tables (source line <-> bytecode index) and local variable tables

use crate::commands::{command_sets, method_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{bounded_capacity, read_count, read_i32, read_string, read_u32, read_u64};
use crate::types::{MethodId, ReferenceTypeId, Variable};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Line table entry - maps source line to bytecode index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTableEntry {
    pub line_code_index: u64,
    pub line_number: i32,
}

/// Complete line table for a method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineTable {
    pub start: u64,
    pub end: u64,
    pub lines: Vec<LineTableEntry>,
}

impl LineTable {
    /// Source line containing a bytecode index: the entry with the greatest
    /// code index not above `index`
    pub fn line_for_index(&self, index: u64) -> Option<i32> {
        self.lines
            .iter()
            .filter(|e| e.line_code_index <= index)
            .max_by_key(|e| e.line_code_index)
            .map(|e| e.line_number)
    }

    /// Lowest bytecode index that starts the given source line
    pub fn first_index_of_line(&self, line: i32) -> Option<u64> {
        self.lines
            .iter()
            .filter(|e| e.line_number == line)
            .map(|e| e.line_code_index)
            .min()
    }
}

impl JdwpConnection {
    /// Get line table for a method (Method.LineTable command)
    pub async fn get_line_table(
        &mut self,
        ref_type_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> JdwpResult<LineTable> {
        let mut packet = CommandPacket::new(self.next_id(), command_sets::METHOD, method_commands::LINE_TABLE);
        packet.data.put_u64(ref_type_id);
        packet.data.put_u64(method_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let start = read_u64(&mut data)?;
        let end = read_u64(&mut data)?;

        let count = read_count(&mut data)?;
        let mut lines = Vec::with_capacity(bounded_capacity(count, data, 12));

        for _ in 0..count {
            lines.push(LineTableEntry {
                line_code_index: read_u64(&mut data)?,
                line_number: read_i32(&mut data)?,
            });
        }

        Ok(LineTable { start, end, lines })
    }

    /// Get variable table for a method (Method.VariableTable command)
    /// Fails with ABSENT_INFORMATION when the class was compiled without -g
    pub async fn get_variable_table(
        &mut self,
        ref_type_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> JdwpResult<Vec<Variable>> {
        let mut packet = CommandPacket::new(self.next_id(), command_sets::METHOD, method_commands::VARIABLE_TABLE);
        packet.data.put_u64(ref_type_id);
        packet.data.put_u64(method_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let _arg_count = read_i32(&mut data)?;

        let count = read_count(&mut data)?;
        let mut variables = Vec::with_capacity(bounded_capacity(count, data, 24));

        for _ in 0..count {
            variables.push(Variable {
                code_index: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                length: read_u32(&mut data)?,
                slot: read_u32(&mut data)?,
            });
        }

        Ok(variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LineTable {
        LineTable {
            start: 0,
            end: 20,
            lines: vec![
                LineTableEntry { line_code_index: 0, line_number: 3 },
                LineTableEntry { line_code_index: 4, line_number: 4 },
                LineTableEntry { line_code_index: 9, line_number: 5 },
                LineTableEntry { line_code_index: 15, line_number: 4 },
            ],
        }
    }

    #[test]
    fn test_line_for_index() {
        let table = table();
        assert_eq!(table.line_for_index(0), Some(3));
        assert_eq!(table.line_for_index(7), Some(4));
        assert_eq!(table.line_for_index(9), Some(5));
        assert_eq!(table.line_for_index(18), Some(4));
    }

    #[test]
    fn test_first_index_of_line() {
        let table = table();
        assert_eq!(table.first_index_of_line(4), Some(4));
        assert_eq!(table.first_index_of_line(5), Some(9));
        assert_eq!(table.first_index_of_line(42), None);
    }
}
