use crate::MessageType;
use thiserror::Error;

/// Failure to encode or decode a GTPv2-C message.  There is no partial result: once one of
/// these is returned the remainder of the buffer cannot be realigned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GtpcError {
    #[error("Truncated buffer - needed {needed} bytes with {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Unsupported GTP-C version {0}")]
    UnsupportedVersion(u8),

    #[error("TEID flag not set in GTP-C header")]
    MissingTeid,

    #[error("Message length {0} shorter than the mandatory header")]
    BadMessageLength(u16),

    #[error("Unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("Message type {0:?} not supported")]
    UnsupportedMessageType(MessageType),

    #[error("Wrong IE type {actual}, expected {expected}")]
    WrongIeType { expected: u8, actual: u8 },

    #[error("Wrong length {actual} for IE type {ie_type}, expected {expected}")]
    WrongIeLength {
        ie_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Wrong instance {instance} for IE type {ie_type}")]
    WrongIeInstance { ie_type: u8, instance: u8 },

    #[error("Wrong packet filter component type {actual:#04x}, expected {expected:#04x}")]
    WrongPacketFilterComponent { expected: u8, actual: u8 },

    #[error("Packet filter direction {0} not valid")]
    BadDirection(u8),

    #[error("{0} packet filters in one QoS rule, maximum is 16")]
    TooManyPacketFilters(usize),

    #[error("Bit rate {0} does not fit in 40 bits")]
    BitRateOutOfRange(u64),

    #[error("Unknown cause value {0}")]
    UnknownCause(u8),

    #[error("Unknown F-TEID interface type {0}")]
    UnknownInterfaceType(u8),

    #[error("Flow context wrapper declared {declared} bytes but its IEs used {actual}")]
    FlowContextLengthMismatch { declared: usize, actual: usize },

    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),

    #[error("Encoded message of {0} bytes does not fit the 16-bit length field")]
    MessageTooLong(usize),
}

/// Failure to process a GTP-U packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GtpuError {
    #[error("GTP-U packet of {0} bytes too short")]
    TooShort(usize),

    #[error("Unhandled GTP-U header values flags={flags:#04x} type={message_type}")]
    UnhandledHeader { flags: u8, message_type: u8 },

    #[error("GTP-U length field {declared} exceeds the {available} payload bytes received")]
    LengthMismatch { declared: usize, available: usize },

    #[error("Payload of {0} bytes does not fit the 16-bit length field")]
    PayloadTooLong(usize),
}
