//! header - GTPv2-C common header, TS29.274, 5.1
//!
//! ```text
//!   0                   1                   2                   3
//!   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +-----+-+-+-----+---------------+-------------------------------+
//!  | Ver |P|T|Spare| Message Type  |        Message Length         |
//!  +-----+-+-+-----+---------------+-------------------------------+
//!  |                             TEID                              |
//!  +-----------------------------------------------+---------------+
//!  |                Sequence Number                |     Spare     |
//!  +-----------------------------------------------+---------------+
//! ```

use crate::{GtpcError, Reader};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const GTPC_VERSION: u8 = 2;
const TEID_FLAG: u8 = 0x08;

/// Size of the header when the TEID is present, which it always is in this profile.
pub const GTPC_HEADER_LEN: usize = 12;

/// The message length field excludes the first four octets of the header (TS29.274, 5.5.1).
const LENGTH_EXCLUDED: usize = 4;

pub const MAX_SEQUENCE_NUMBER: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    CreateSessionRequest = 32,
    CreateSessionResponse = 33,
    ModifyFlowRequest = 34,
    ModifyFlowResponse = 35,
    DeleteSessionRequest = 36,
    DeleteSessionResponse = 37,
    DeleteFlowCommand = 66,
    DeleteFlowRequest = 99,
    DeleteFlowResponse = 100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtpcHeader {
    pub message_type: MessageType,
    pub message_length: u16,
    pub teid: u32,
    pub sequence_number: u32,
}

impl GtpcHeader {
    /// Build a header for a body of `body_len` bytes.  The header only knows its own framing
    /// overhead; the body size comes from the message.
    pub fn new(
        message_type: MessageType,
        body_len: usize,
        teid: u32,
        sequence_number: u32,
    ) -> Result<Self, GtpcError> {
        let length = body_len + GTPC_HEADER_LEN - LENGTH_EXCLUDED;
        let message_length =
            u16::try_from(length).map_err(|_| GtpcError::MessageTooLong(length))?;
        Ok(GtpcHeader {
            message_type,
            message_length,
            teid,
            sequence_number: sequence_number & MAX_SEQUENCE_NUMBER,
        })
    }

    /// Number of body bytes that follow the 12 byte header.
    pub fn body_len(&self) -> usize {
        (self.message_length as usize + LENGTH_EXCLUDED).saturating_sub(GTPC_HEADER_LEN)
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push((GTPC_VERSION << 5) | TEID_FLAG);
        buf.push(self.message_type.into());
        buf.extend_from_slice(&self.message_length.to_be_bytes());
        buf.extend_from_slice(&self.teid.to_be_bytes());
        buf.extend_from_slice(&self.sequence_number.to_be_bytes()[1..]);
        buf.push(0);
    }

    pub fn decode(r: &mut Reader) -> Result<Self, GtpcError> {
        let flags = r.read_u8()?;
        let version = flags >> 5;
        if version != GTPC_VERSION {
            return Err(GtpcError::UnsupportedVersion(version));
        }
        if flags & TEID_FLAG == 0 {
            return Err(GtpcError::MissingTeid);
        }
        let message_type = r.read_u8()?;
        let message_type = MessageType::try_from(message_type)
            .map_err(|_| GtpcError::UnknownMessageType(message_type))?;
        let message_length = r.read_u16_be()?;
        if (message_length as usize) < GTPC_HEADER_LEN - LENGTH_EXCLUDED {
            return Err(GtpcError::BadMessageLength(message_length));
        }
        let teid = r.read_u32_be()?;
        let sequence_number = r.read_u24_be()?;
        let _spare = r.read_u8()?;
        Ok(GtpcHeader {
            message_type,
            message_length,
            teid,
            sequence_number,
        })
    }

    /// Decode the header at the front of a datagram without consuming it, so that the caller
    /// can branch on the message type before decoding the body.
    pub fn peek(buf: &[u8]) -> Result<Self, GtpcError> {
        Self::decode(&mut Reader::new(buf))
    }
}
