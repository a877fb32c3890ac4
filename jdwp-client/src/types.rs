// JDWP type definitions
//
// IDs, locations and tagged values shared by every command set

use serde::{Deserialize, Serialize};

// Object IDs are 8 bytes on every HotSpot VM; ID sizes are assumed, not negotiated
pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type StringId = ObjectId;
pub type ArrayId = ObjectId;

pub type ReferenceTypeId = u64;
pub type ClassId = ReferenceTypeId;

pub type MethodId = u64;
pub type FieldId = u64;
pub type FrameId = u64;

/// Request IDs handed out by EventRequest.Set
pub type RequestId = i32;

// Location identifies a code position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub type_tag: u8, // 1=class, 2=interface, 3=array
    pub class_id: ReferenceTypeId,
    pub method_id: MethodId,
    pub index: u64, // bytecode index (PC)
}

// Value tags, as used in tagged values and signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Array = b'[',
    Byte = b'B',
    Char = b'C',
    Object = b'L',
    Float = b'F',
    Double = b'D',
    Int = b'I',
    Long = b'J',
    Short = b'S',
    Void = b'V',
    Boolean = b'Z',
    String = b's',
    Thread = b't',
    ThreadGroup = b'g',
    ClassLoader = b'l',
    ClassObject = b'c',
}

impl TypeTag {
    /// Tags whose values are object IDs
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            TypeTag::Array
                | TypeTag::Object
                | TypeTag::String
                | TypeTag::Thread
                | TypeTag::ThreadGroup
                | TypeTag::ClassLoader
                | TypeTag::ClassObject
        )
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            b'[' => TypeTag::Array,
            b'B' => TypeTag::Byte,
            b'C' => TypeTag::Char,
            b'L' => TypeTag::Object,
            b'F' => TypeTag::Float,
            b'D' => TypeTag::Double,
            b'I' => TypeTag::Int,
            b'J' => TypeTag::Long,
            b'S' => TypeTag::Short,
            b'V' => TypeTag::Void,
            b'Z' => TypeTag::Boolean,
            b's' => TypeTag::String,
            b't' => TypeTag::Thread,
            b'g' => TypeTag::ThreadGroup,
            b'l' => TypeTag::ClassLoader,
            b'c' => TypeTag::ClassObject,
            other => return Err(other),
        })
    }
}

// Tagged value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub tag: TypeTag,
    pub data: ValueData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueData {
    Byte(i8),
    Char(u16),
    Float(f32),
    Double(f64),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    Object(ObjectId),
    Void,
}

impl Value {
    /// Object ID for reference values, `None` for primitives
    pub fn object_id(&self) -> Option<ObjectId> {
        match self.data {
            ValueData::Object(id) => Some(id),
            _ => None,
        }
    }
}

// Local variable from Method.VariableTable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub code_index: u64,
    pub name: String,
    pub signature: String,
    pub length: u32,
    pub slot: u32,
}

impl Variable {
    /// Whether the variable is live at the given bytecode index
    pub fn is_visible_at(&self, index: u64) -> bool {
        index >= self.code_index && index < self.code_index + self.length as u64
    }
}
