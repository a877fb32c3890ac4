// Bounds-checked readers for JDWP reply and event payloads

use crate::protocol::{JdwpError, JdwpResult};
use crate::types::{Location, TypeTag, Value, ValueData};
use bytes::Buf;

fn ensure(buf: &&[u8], needed: usize, what: &str) -> JdwpResult<()> {
    if buf.remaining() < needed {
        return Err(JdwpError::Protocol(format!(
            "Not enough data for {}: need {}, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

/// Read a JDWP string (4-byte length prefix + UTF-8 bytes)
pub fn read_string(buf: &mut &[u8]) -> JdwpResult<String> {
    let len = read_u32(buf)? as usize;
    ensure(buf, len, "string")?;

    let bytes = &buf[..len];
    let value = String::from_utf8(bytes.to_vec())
        .map_err(|e| JdwpError::Protocol(format!("Invalid UTF-8 in string: {}", e)))?;
    buf.advance(len);

    Ok(value)
}

pub fn read_u8(buf: &mut &[u8]) -> JdwpResult<u8> {
    ensure(buf, 1, "u8")?;
    Ok(buf.get_u8())
}

pub fn read_bool(buf: &mut &[u8]) -> JdwpResult<bool> {
    Ok(read_u8(buf)? != 0)
}

pub fn read_u16(buf: &mut &[u8]) -> JdwpResult<u16> {
    ensure(buf, 2, "u16")?;
    Ok(buf.get_u16())
}

pub fn read_u32(buf: &mut &[u8]) -> JdwpResult<u32> {
    ensure(buf, 4, "u32")?;
    Ok(buf.get_u32())
}

pub fn read_i32(buf: &mut &[u8]) -> JdwpResult<i32> {
    ensure(buf, 4, "i32")?;
    Ok(buf.get_i32())
}

pub fn read_u64(buf: &mut &[u8]) -> JdwpResult<u64> {
    ensure(buf, 8, "u64")?;
    Ok(buf.get_u64())
}

/// Read a non-negative count prefix
pub fn read_count(buf: &mut &[u8]) -> JdwpResult<usize> {
    let count = read_i32(buf)?;
    usize::try_from(count).map_err(|_| JdwpError::Protocol(format!("Negative count: {}", count)))
}

/// Preallocation for `count` entries of at least `entry_size` bytes each
///
/// Counts come off the wire, so never reserve more than the rest of the payload can hold.
pub fn bounded_capacity(count: usize, buf: &[u8], entry_size: usize) -> usize {
    count.min(buf.len() / entry_size.max(1))
}

/// Read a location (type tag, class, method, index)
pub fn read_location(buf: &mut &[u8]) -> JdwpResult<Location> {
    let type_tag = read_u8(buf)?;
    let class_id = read_u64(buf)?;
    let method_id = read_u64(buf)?;
    let index = read_u64(buf)?;

    Ok(Location {
        type_tag,
        class_id,
        method_id,
        index,
    })
}

/// Read a tag byte
pub fn read_tag(buf: &mut &[u8]) -> JdwpResult<TypeTag> {
    let raw = read_u8(buf)?;
    TypeTag::try_from(raw).map_err(|tag| JdwpError::Protocol(format!("Unknown value tag: {}", tag)))
}

/// Read a value that is prefixed with its tag
pub fn read_tagged_value(buf: &mut &[u8]) -> JdwpResult<Value> {
    let tag = read_tag(buf)?;
    read_untagged_value(tag, buf)
}

/// Read a value whose tag is known from context (e.g. primitive array regions)
pub fn read_untagged_value(tag: TypeTag, buf: &mut &[u8]) -> JdwpResult<Value> {
    let data = match tag {
        TypeTag::Byte => {
            ensure(buf, 1, "byte")?;
            ValueData::Byte(buf.get_i8())
        }
        TypeTag::Char => ValueData::Char(read_u16(buf)?),
        TypeTag::Double => {
            ensure(buf, 8, "double")?;
            ValueData::Double(buf.get_f64())
        }
        TypeTag::Float => {
            ensure(buf, 4, "float")?;
            ValueData::Float(buf.get_f32())
        }
        TypeTag::Int => ValueData::Int(read_i32(buf)?),
        TypeTag::Long => {
            ensure(buf, 8, "long")?;
            ValueData::Long(buf.get_i64())
        }
        TypeTag::Short => {
            ensure(buf, 2, "short")?;
            ValueData::Short(buf.get_i16())
        }
        TypeTag::Boolean => ValueData::Boolean(read_bool(buf)?),
        TypeTag::Void => ValueData::Void,
        reference => {
            debug_assert!(reference.is_reference());
            ValueData::Object(read_u64(buf)?)
        }
    };

    Ok(Value { tag, data })
}
