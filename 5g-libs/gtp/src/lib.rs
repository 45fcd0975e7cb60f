//! gtp - GTPv2-C control plane and GTP-U user plane codecs

mod error;
mod gtpu;
mod header;
mod ies;
mod messages;
mod qos;
mod reader;

pub use error::{GtpcError, GtpuError};
pub use gtpu::{GTPU_HEADER_LEN, decapsulate, encapsulate};
pub use header::{GTPC_HEADER_LEN, GtpcHeader, MAX_SEQUENCE_NUMBER, MessageType};
pub use ies::{Cause, Fteid, InterfaceType, PACKET_FILTER_LEN};
pub use messages::{
    CreateSessionRequest, CreateSessionResponse, DeleteFlowCommand, DeleteFlowRequest,
    DeleteFlowResponse, FlowContext, FlowToBeModified, GtpcMessage, GtpcPdu, ModifyFlowRequest,
    ModifyFlowResponse,
};
pub use qos::{
    Direction, FiveQi, FiveQiCharacteristics, MAX_BIT_RATE, MAX_PACKET_FILTERS, PacketFilter, QosFlow,
    QosRule, ResourceType,
};
pub use reader::Reader;

pub const GTPC_PORT: u16 = 2123; // TS29.274
pub const GTPU_PORT: u16 = 2152; // TS29.281
