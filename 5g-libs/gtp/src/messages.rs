//! messages - the seven GTP-C message bodies and the message-type dispatch

use crate::header::{GTPC_HEADER_LEN, GtpcHeader};
use crate::ies::{
    FLOW_CONTEXT_HEADER_LEN, Imsi, InformationElement, Qfi, UliEcgi, decode_flow_context_header,
    encode_flow_context_header,
};
use crate::{Cause, Fteid, GtpcError, MessageType, QosFlow, QosRule, Reader};

/// A flow being created, as carried in CreateSessionRequest and CreateSessionResponse.
/// In a request the F-TEID is the sender's user plane endpoint for the flow; in a response
/// it is the responder's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowContext {
    pub qfi: u8,
    pub rule: QosRule,
    pub fteid: Fteid,
    pub qos: QosFlow,
}

/// A flow whose downlink endpoint is being switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowToBeModified {
    pub qfi: u8,
    pub fteid: Fteid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub imsi: u64,
    pub cell_id: u32,
    pub sender_fteid: Fteid,
    pub flows: Vec<FlowContext>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionResponse {
    pub cause: Cause,
    pub sender_fteid: Fteid,
    pub flows: Vec<FlowContext>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyFlowRequest {
    pub imsi: u64,
    pub cell_id: u32,
    pub flows: Vec<FlowToBeModified>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyFlowResponse {
    pub cause: Cause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFlowCommand {
    pub qfis: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFlowRequest {
    pub qfis: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFlowResponse {
    pub cause: Cause,
    pub qfis: Vec<u8>,
}

/// A message body.  The body knows its own size; the header adds the framing overhead.
pub(crate) trait GtpcBody: Sized {
    const MESSAGE_TYPE: MessageType;
    fn body_len(&self) -> usize;
    fn encode_body(&self, buf: &mut Vec<u8>);
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError>;

    /// Reject values that the wire format cannot carry.
    fn validate(&self) -> Result<(), GtpcError> {
        Ok(())
    }
}

/// Something carried inside a flow context wrapper IE.
trait Wrapped: Sized {
    fn nested_len(&self) -> usize;
    fn encode_nested(&self, buf: &mut Vec<u8>);
    fn decode_nested(r: &mut Reader) -> Result<Self, GtpcError>;
}

impl Wrapped for FlowContext {
    fn nested_len(&self) -> usize {
        Qfi(self.qfi).encoded_len()
            + self.rule.encoded_len()
            + self.fteid.encoded_len()
            + self.qos.encoded_len()
    }
    fn encode_nested(&self, buf: &mut Vec<u8>) {
        Qfi(self.qfi).encode(buf);
        self.rule.encode(buf);
        self.fteid.encode(buf);
        self.qos.encode(buf);
    }
    fn decode_nested(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(FlowContext {
            qfi: Qfi::decode(r)?.0,
            rule: QosRule::decode(r)?,
            fteid: Fteid::decode(r)?,
            qos: QosFlow::decode(r)?,
        })
    }
}

impl Wrapped for FlowToBeModified {
    fn nested_len(&self) -> usize {
        Qfi(self.qfi).encoded_len() + self.fteid.encoded_len()
    }
    fn encode_nested(&self, buf: &mut Vec<u8>) {
        Qfi(self.qfi).encode(buf);
        self.fteid.encode(buf);
    }
    fn decode_nested(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(FlowToBeModified {
            qfi: Qfi::decode(r)?.0,
            fteid: Fteid::decode(r)?,
        })
    }
}

impl Wrapped for Qfi {
    fn nested_len(&self) -> usize {
        self.encoded_len()
    }
    fn encode_nested(&self, buf: &mut Vec<u8>) {
        self.encode(buf);
    }
    fn decode_nested(r: &mut Reader) -> Result<Self, GtpcError> {
        Qfi::decode(r)
    }
}

fn wrapped_len<T: Wrapped>(items: &[T]) -> usize {
    items
        .iter()
        .map(|x| FLOW_CONTEXT_HEADER_LEN + x.nested_len())
        .sum()
}

fn encode_wrapped<T: Wrapped>(items: &[T], buf: &mut Vec<u8>) {
    for item in items {
        encode_flow_context_header(buf, item.nested_len());
        item.encode_nested(buf);
    }
}

/// Decode flow contexts until the body is used up.
fn decode_wrapped<T: Wrapped>(r: &mut Reader) -> Result<Vec<T>, GtpcError> {
    let mut items = vec![];
    while !r.is_empty() {
        let declared = decode_flow_context_header(r)?;
        let start = r.position();
        items.push(T::decode_nested(r)?);
        let actual = r.position() - start;
        if actual != declared {
            return Err(GtpcError::FlowContextLengthMismatch { declared, actual });
        }
    }
    Ok(items)
}

fn bare_qfis_len(qfis: &[u8]) -> usize {
    qfis.iter().map(|q| Qfi(*q).encoded_len()).sum()
}

fn encode_bare_qfis(qfis: &[u8], buf: &mut Vec<u8>) {
    for qfi in qfis {
        Qfi(*qfi).encode(buf);
    }
}

fn decode_bare_qfis(r: &mut Reader) -> Result<Vec<u8>, GtpcError> {
    let mut qfis = vec![];
    while !r.is_empty() {
        qfis.push(Qfi::decode(r)?.0);
    }
    Ok(qfis)
}

impl GtpcBody for CreateSessionRequest {
    const MESSAGE_TYPE: MessageType = MessageType::CreateSessionRequest;

    fn validate(&self) -> Result<(), GtpcError> {
        self.flows.iter().try_for_each(|f| f.qos.validate())
    }

    fn body_len(&self) -> usize {
        Imsi(self.imsi).encoded_len()
            + UliEcgi(self.cell_id).encoded_len()
            + self.sender_fteid.encoded_len()
            + wrapped_len(&self.flows)
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        Imsi(self.imsi).encode(buf);
        UliEcgi(self.cell_id).encode(buf);
        self.sender_fteid.encode(buf);
        encode_wrapped(&self.flows, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(CreateSessionRequest {
            imsi: Imsi::decode(r)?.0,
            cell_id: UliEcgi::decode(r)?.0,
            sender_fteid: Fteid::decode(r)?,
            flows: decode_wrapped(r)?,
        })
    }
}

impl GtpcBody for CreateSessionResponse {
    const MESSAGE_TYPE: MessageType = MessageType::CreateSessionResponse;

    fn validate(&self) -> Result<(), GtpcError> {
        self.flows.iter().try_for_each(|f| f.qos.validate())
    }

    fn body_len(&self) -> usize {
        self.cause.encoded_len() + self.sender_fteid.encoded_len() + wrapped_len(&self.flows)
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        self.cause.encode(buf);
        self.sender_fteid.encode(buf);
        encode_wrapped(&self.flows, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(CreateSessionResponse {
            cause: Cause::decode(r)?,
            sender_fteid: Fteid::decode(r)?,
            flows: decode_wrapped(r)?,
        })
    }
}

impl GtpcBody for ModifyFlowRequest {
    const MESSAGE_TYPE: MessageType = MessageType::ModifyFlowRequest;

    fn body_len(&self) -> usize {
        Imsi(self.imsi).encoded_len()
            + UliEcgi(self.cell_id).encoded_len()
            + wrapped_len(&self.flows)
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        Imsi(self.imsi).encode(buf);
        UliEcgi(self.cell_id).encode(buf);
        encode_wrapped(&self.flows, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(ModifyFlowRequest {
            imsi: Imsi::decode(r)?.0,
            cell_id: UliEcgi::decode(r)?.0,
            flows: decode_wrapped(r)?,
        })
    }
}

impl GtpcBody for ModifyFlowResponse {
    const MESSAGE_TYPE: MessageType = MessageType::ModifyFlowResponse;

    fn body_len(&self) -> usize {
        self.cause.encoded_len()
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        self.cause.encode(buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(ModifyFlowResponse {
            cause: Cause::decode(r)?,
        })
    }
}

impl GtpcBody for DeleteFlowCommand {
    const MESSAGE_TYPE: MessageType = MessageType::DeleteFlowCommand;

    fn body_len(&self) -> usize {
        self.qfis
            .iter()
            .map(|q| FLOW_CONTEXT_HEADER_LEN + Qfi(*q).nested_len())
            .sum()
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        let wrapped: Vec<Qfi> = self.qfis.iter().map(|q| Qfi(*q)).collect();
        encode_wrapped(&wrapped, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        let wrapped: Vec<Qfi> = decode_wrapped(r)?;
        Ok(DeleteFlowCommand {
            qfis: wrapped.into_iter().map(|q| q.0).collect(),
        })
    }
}

impl GtpcBody for DeleteFlowRequest {
    const MESSAGE_TYPE: MessageType = MessageType::DeleteFlowRequest;

    fn body_len(&self) -> usize {
        bare_qfis_len(&self.qfis)
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        encode_bare_qfis(&self.qfis, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(DeleteFlowRequest {
            qfis: decode_bare_qfis(r)?,
        })
    }
}

impl GtpcBody for DeleteFlowResponse {
    const MESSAGE_TYPE: MessageType = MessageType::DeleteFlowResponse;

    fn body_len(&self) -> usize {
        self.cause.encoded_len() + bare_qfis_len(&self.qfis)
    }
    fn encode_body(&self, buf: &mut Vec<u8>) {
        self.cause.encode(buf);
        encode_bare_qfis(&self.qfis, buf);
    }
    fn decode_body(r: &mut Reader) -> Result<Self, GtpcError> {
        Ok(DeleteFlowResponse {
            cause: Cause::decode(r)?,
            qfis: decode_bare_qfis(r)?,
        })
    }
}

macro_rules! gtpc_messages {
    ($($name:ident),* $(,)?) => {
        /// Any supported GTP-C message body, tagged by its type.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum GtpcMessage {
            $($name($name)),*
        }

        impl GtpcMessage {
            pub fn message_type(&self) -> MessageType {
                match self {
                    $(GtpcMessage::$name(_) => $name::MESSAGE_TYPE),*
                }
            }

            fn body_len(&self) -> usize {
                match self {
                    $(GtpcMessage::$name(m) => m.body_len()),*
                }
            }

            fn encode_body(&self, buf: &mut Vec<u8>) {
                match self {
                    $(GtpcMessage::$name(m) => m.encode_body(buf)),*
                }
            }

            fn validate(&self) -> Result<(), GtpcError> {
                match self {
                    $(GtpcMessage::$name(m) => m.validate()),*
                }
            }

            fn decode_body(message_type: MessageType, r: &mut Reader) -> Result<Self, GtpcError> {
                match message_type {
                    $(MessageType::$name => Ok(GtpcMessage::$name($name::decode_body(r)?)),)*
                    other => Err(GtpcError::UnsupportedMessageType(other)),
                }
            }
        }

        $(
            impl From<$name> for GtpcMessage {
                fn from(m: $name) -> Self {
                    GtpcMessage::$name(m)
                }
            }
        )*
    };
}

gtpc_messages!(
    CreateSessionRequest,
    CreateSessionResponse,
    ModifyFlowRequest,
    ModifyFlowResponse,
    DeleteFlowCommand,
    DeleteFlowRequest,
    DeleteFlowResponse,
);

/// A complete GTP-C datagram: header fields plus message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpcPdu {
    pub teid: u32,
    pub sequence_number: u32,
    pub message: GtpcMessage,
}

impl GtpcPdu {
    pub fn new(teid: u32, sequence_number: u32, message: impl Into<GtpcMessage>) -> Self {
        GtpcPdu {
            teid,
            sequence_number,
            message: message.into(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    pub fn encode(&self) -> Result<Vec<u8>, GtpcError> {
        self.message.validate()?;
        let body_len = self.message.body_len();
        let header = GtpcHeader::new(
            self.message.message_type(),
            body_len,
            self.teid,
            self.sequence_number,
        )?;
        let mut buf = Vec::with_capacity(GTPC_HEADER_LEN + body_len);
        header.encode(&mut buf);
        self.message.encode_body(&mut buf);
        Ok(buf)
    }

    /// Decode a datagram.  The header is read first so that the body decoder can be chosen
    /// by message type and bounded by the message length.  Bytes after the declared message
    /// length are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, GtpcError> {
        let mut r = Reader::new(buf);
        let header = GtpcHeader::decode(&mut r)?;
        let mut body = Reader::new(r.take(header.body_len())?);
        let message = GtpcMessage::decode_body(header.message_type, &mut body)?;
        if !body.is_empty() {
            return Err(GtpcError::TrailingBytes(body.remaining()));
        }
        Ok(GtpcPdu {
            teid: header.teid,
            sequence_number: header.sequence_number,
            message,
        })
    }
}
