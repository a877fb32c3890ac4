// JDWP packet framing and error types
//
// Reference: https://docs.oracle.com/javase/8/docs/platform/jpda/jdwp/jdwp-protocol.html

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

// Everything on the wire is big-endian (network byte order)

pub type JdwpResult<T> = Result<T, JdwpError>;

#[derive(Debug, Error)]
pub enum JdwpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid handshake")]
    InvalidHandshake,

    #[error("JDWP error code {0}: {1}")]
    JdwpErrorCode(u16, String),

    #[error("Connection closed")]
    ConnectionClosed,
}

impl JdwpError {
    /// True when the error means the target VM is gone
    pub fn is_disconnect(&self) -> bool {
        match self {
            JdwpError::ConnectionClosed => true,
            JdwpError::JdwpErrorCode(code, _) => *code == error_codes::VM_DEAD,
            JdwpError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// The raw JDWP error code, if the VM rejected the command
    pub fn error_code(&self) -> Option<u16> {
        match self {
            JdwpError::JdwpErrorCode(code, _) => Some(*code),
            _ => None,
        }
    }
}

/// JDWP error codes the client reacts to
pub mod error_codes {
    pub const NONE: u16 = 0;
    pub const INVALID_THREAD: u16 = 10;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const INVALID_CLASS: u16 = 21;
    pub const CLASS_NOT_PREPARED: u16 = 22;
    pub const INVALID_METHODID: u16 = 23;
    pub const INVALID_LOCATION: u16 = 24;
    pub const INVALID_FIELDID: u16 = 25;
    pub const INVALID_FRAMEID: u16 = 30;
    pub const NO_MORE_FRAMES: u16 = 31;
    pub const OPAQUE_FRAME: u16 = 32;
    pub const TYPE_MISMATCH: u16 = 34;
    pub const INVALID_SLOT: u16 = 35;
    pub const DUPLICATE: u16 = 40;
    pub const NOT_FOUND: u16 = 41;
    pub const NOT_IMPLEMENTED: u16 = 99;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const INVALID_EVENT_TYPE: u16 = 102;
    pub const ILLEGAL_ARGUMENT: u16 = 103;
    pub const VM_DEAD: u16 = 112;
    pub const INTERNAL: u16 = 113;
    pub const INVALID_INDEX: u16 = 503;
    pub const INVALID_LENGTH: u16 = 504;
    pub const INVALID_STRING: u16 = 506;
    pub const INVALID_ARRAY: u16 = 508;
}

// JDWP handshake string
pub const JDWP_HANDSHAKE: &[u8] = b"JDWP-Handshake";

// Packet layout:
// length (4) - includes header
// id (4)
// flags (1) - 0x00 = command, 0x80 = reply
// [command: command set (1) + command (1)] or [reply: error code (2)]
// data

pub const HEADER_SIZE: usize = 11;
pub const REPLY_FLAG: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct CommandPacket {
    pub id: u32,
    pub command_set: u8,
    pub command: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReplyPacket {
    pub id: u32,
    pub error_code: u16,
    pub data: Vec<u8>,
}

impl CommandPacket {
    pub fn new(id: u32, command_set: u8, command: u8) -> Self {
        Self {
            id,
            command_set,
            command,
            data: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let length = HEADER_SIZE + self.data.len();
        let mut buf = BytesMut::with_capacity(length);

        buf.put_u32(length as u32);
        buf.put_u32(self.id);
        buf.put_u8(0x00);
        buf.put_u8(self.command_set);
        buf.put_u8(self.command);
        buf.put_slice(&self.data);

        buf.to_vec()
    }
}

impl ReplyPacket {
    pub fn decode(mut buf: &[u8]) -> JdwpResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(JdwpError::Protocol("Reply packet too short".to_string()));
        }

        let _length = buf.get_u32();
        let id = buf.get_u32();
        let flags = buf.get_u8();

        if flags != REPLY_FLAG {
            return Err(JdwpError::Protocol(format!("Invalid reply flag: {:#x}", flags)));
        }

        let error_code = buf.get_u16();

        Ok(Self {
            id,
            error_code,
            data: buf.to_vec(),
        })
    }

    pub fn is_error(&self) -> bool {
        self.error_code != error_codes::NONE
    }

    /// Turn a non-zero error code into a `JdwpErrorCode` error
    pub fn check_error(&self) -> JdwpResult<()> {
        if self.is_error() {
            Err(JdwpError::JdwpErrorCode(
                self.error_code,
                error_name(self.error_code).to_string(),
            ))
        } else {
            Ok(())
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Symbolic name of a JDWP error code
pub fn error_name(code: u16) -> &'static str {
    use error_codes::*;

    match code {
        NONE => "NONE",
        INVALID_THREAD => "INVALID_THREAD",
        THREAD_NOT_SUSPENDED => "THREAD_NOT_SUSPENDED",
        INVALID_OBJECT => "INVALID_OBJECT",
        INVALID_CLASS => "INVALID_CLASS",
        CLASS_NOT_PREPARED => "CLASS_NOT_PREPARED",
        INVALID_METHODID => "INVALID_METHODID",
        INVALID_LOCATION => "INVALID_LOCATION",
        INVALID_FIELDID => "INVALID_FIELDID",
        INVALID_FRAMEID => "INVALID_FRAMEID",
        NO_MORE_FRAMES => "NO_MORE_FRAMES",
        OPAQUE_FRAME => "OPAQUE_FRAME",
        TYPE_MISMATCH => "TYPE_MISMATCH",
        INVALID_SLOT => "INVALID_SLOT",
        DUPLICATE => "DUPLICATE",
        NOT_FOUND => "NOT_FOUND",
        NOT_IMPLEMENTED => "NOT_IMPLEMENTED",
        ABSENT_INFORMATION => "ABSENT_INFORMATION",
        INVALID_EVENT_TYPE => "INVALID_EVENT_TYPE",
        ILLEGAL_ARGUMENT => "ILLEGAL_ARGUMENT",
        VM_DEAD => "VM_DEAD",
        INTERNAL => "INTERNAL",
        INVALID_INDEX => "INVALID_INDEX",
        INVALID_LENGTH => "INVALID_LENGTH",
        INVALID_STRING => "INVALID_STRING",
        INVALID_ARRAY => "INVALID_ARRAY",
        _ => "UNKNOWN_ERROR",
    }
}
