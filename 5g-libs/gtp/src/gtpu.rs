//! gtpu - minimal GTP-U header for tunneled user plane packets, TS29.281, 5.1
//!
//! Only the 8 byte mandatory header is used: version 1, protocol type GTP, no optional fields,
//! message type G-PDU.

use crate::GtpuError;

pub const GTPU_HEADER_LEN: usize = 8;
const GTPU_FLAGS: u8 = 0x30;
const GTP_MESSAGE_TYPE_GPDU: u8 = 255; // TS29.281, table 6.1-1

/// Prepend a GTP-U header to an inner packet.
pub fn encapsulate(teid: u32, payload: &[u8]) -> Result<Vec<u8>, GtpuError> {
    let length = u16::try_from(payload.len()).map_err(|_| GtpuError::PayloadTooLong(payload.len()))?;
    let mut packet = Vec::with_capacity(GTPU_HEADER_LEN + payload.len());
    packet.push(GTPU_FLAGS);
    packet.push(GTP_MESSAGE_TYPE_GPDU);
    packet.extend_from_slice(&length.to_be_bytes());
    packet.extend_from_slice(&teid.to_be_bytes());
    packet.extend_from_slice(payload);
    Ok(packet)
}

/// View the TEID and inner packet of a received GTP-U packet.
pub fn decapsulate(packet: &[u8]) -> Result<(u32, &[u8]), GtpuError> {
    if packet.len() < GTPU_HEADER_LEN {
        return Err(GtpuError::TooShort(packet.len()));
    }

    // Check that there are no optional fields that would move the inner packet.
    if packet[0] != GTPU_FLAGS || packet[1] != GTP_MESSAGE_TYPE_GPDU {
        return Err(GtpuError::UnhandledHeader {
            flags: packet[0],
            message_type: packet[1],
        });
    }
    let declared = u16::from_be_bytes([packet[2], packet[3]]) as usize;
    let available = packet.len() - GTPU_HEADER_LEN;
    if declared > available {
        return Err(GtpuError::LengthMismatch {
            declared,
            available,
        });
    }
    let teid = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
    Ok((teid, &packet[GTPU_HEADER_LEN..GTPU_HEADER_LEN + declared]))
}
