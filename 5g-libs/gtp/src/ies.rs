//! ies - GTP-C information elements
//!
//! Every IE is framed as type (1 byte), length (2 bytes, big-endian), spare/instance (1 byte)
//! then `length` bytes of payload.  The flow context wrapper is the exception: its length is
//! little-endian and it is followed by nested IEs rather than an opaque payload.

use crate::qos::{Direction, MAX_PACKET_FILTERS};
use crate::{FiveQi, GtpcError, PacketFilter, QosFlow, QosRule, Reader};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::Ipv4Addr;

pub const IE_HEADER_LEN: usize = 4;
pub const FLOW_CONTEXT_HEADER_LEN: usize = 4;

// Packet filter component type identifiers, TS24.008, table 10.5.162.
const PF_IPV4_REMOTE_ADDRESS: u8 = 0x10;
const PF_IPV4_LOCAL_ADDRESS: u8 = 0x11;
const PF_LOCAL_PORT_RANGE: u8 = 0x41;
const PF_REMOTE_PORT_RANGE: u8 = 0x51;
const PF_TYPE_OF_SERVICE: u8 = 0x70;

/// Contents of one packet filter after the direction and length octets.
const PACKET_FILTER_CONTENTS_LEN: usize = 9 + 9 + 5 + 5 + 3;
pub const PACKET_FILTER_LEN: usize = 2 + PACKET_FILTER_CONTENTS_LEN;

const CREATE_NEW_QOS_RULE: u8 = 0x20;
const QFI_MASK: u8 = 0x7f;
const ECGI_PRESENT: u8 = 0x10;
const ECI_MASK: u32 = 0x0fff_ffff;
const FTEID_IPV4: u8 = 0x80;
const INTERFACE_TYPE_MASK: u8 = 0x1f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum IeType {
    Imsi = 1,
    Cause = 2,
    Qfi = 73,
    QosFlow = 80,
    QosRule = 84,
    UliEcgi = 86,
    Fteid = 87,
    FlowContext = 93,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Cause {
    Reserved = 0,
    RequestAccepted = 16,
    RequestAcceptedPartially = 17,
    ContextNotFound = 64,
    RequestRejected = 94,
}

/// F-TEID interface type, TS29.274, table 8.22-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InterfaceType {
    S1uGnbGtpu = 0,
    S1uSgwGtpu = 1,
    S5SgwGtpu = 4,
    S5PgwGtpu = 5,
    S5SgwGtpc = 6,
    S5PgwGtpc = 7,
    S11MmeGtpc = 10,
    S11SgwGtpc = 11,
}

/// Fully qualified TEID - one endpoint of one tunnel leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fteid {
    pub interface_type: InterfaceType,
    pub teid: u32,
    pub addr: Ipv4Addr,
}

impl Fteid {
    pub fn new(interface_type: InterfaceType, addr: Ipv4Addr, teid: u32) -> Self {
        Fteid {
            interface_type,
            teid,
            addr,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct Imsi(pub u64);
pub(crate) struct Qfi(pub u8);
pub(crate) struct UliEcgi(pub u32);

pub(crate) trait InformationElement: Sized {
    const IE_TYPE: IeType;

    /// Payload length for IEs that have a fixed size.
    const FIXED_LEN: Option<usize>;

    fn payload_len(&self) -> usize;
    fn encode_payload(&self, buf: &mut Vec<u8>);
    fn decode_payload(r: &mut Reader, len: usize) -> Result<Self, GtpcError>;

    fn encoded_len(&self) -> usize {
        IE_HEADER_LEN + self.payload_len()
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(Self::IE_TYPE.into());
        buf.extend_from_slice(&(self.payload_len() as u16).to_be_bytes());
        buf.push(0);
        self.encode_payload(buf);
    }

    fn decode(r: &mut Reader) -> Result<Self, GtpcError> {
        let ie_type: u8 = Self::IE_TYPE.into();
        check_ie_type(r, ie_type)?;
        let len = r.read_u16_be()? as usize;
        match Self::FIXED_LEN {
            Some(expected) if expected != len => {
                return Err(GtpcError::WrongIeLength {
                    ie_type,
                    expected,
                    actual: len,
                });
            }
            _ => (),
        }
        check_instance(r, ie_type)?;
        let mut payload = Reader::new(r.take(len)?);
        let ie = Self::decode_payload(&mut payload, len)?;
        if !payload.is_empty() {
            return Err(GtpcError::WrongIeLength {
                ie_type,
                expected: payload.position(),
                actual: len,
            });
        }
        Ok(ie)
    }
}

fn check_ie_type(r: &mut Reader, expected: u8) -> Result<(), GtpcError> {
    let actual = r.read_u8()?;
    if actual != expected {
        return Err(GtpcError::WrongIeType { expected, actual });
    }
    Ok(())
}

fn check_instance(r: &mut Reader, ie_type: u8) -> Result<(), GtpcError> {
    let instance = r.read_u8()? & 0x0f;
    if instance != 0 {
        return Err(GtpcError::WrongIeInstance { ie_type, instance });
    }
    Ok(())
}

impl InformationElement for Imsi {
    const IE_TYPE: IeType = IeType::Imsi;
    const FIXED_LEN: Option<usize> = Some(8);

    fn payload_len(&self) -> usize {
        8
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0.to_be_bytes());
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        Ok(Imsi(r.read_u64_be()?))
    }
}

impl InformationElement for Cause {
    const IE_TYPE: IeType = IeType::Cause;
    const FIXED_LEN: Option<usize> = Some(2);

    fn payload_len(&self) -> usize {
        2
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push((*self).into());
        buf.push(0);
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        let value = r.read_u8()?;
        let _spare = r.read_u8()?;
        Cause::try_from(value).map_err(|_| GtpcError::UnknownCause(value))
    }
}

impl InformationElement for Qfi {
    const IE_TYPE: IeType = IeType::Qfi;
    const FIXED_LEN: Option<usize> = Some(1);

    fn payload_len(&self) -> usize {
        1
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push(self.0 & QFI_MASK);
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        Ok(Qfi(r.read_u8()? & QFI_MASK))
    }
}

impl InformationElement for QosFlow {
    const IE_TYPE: IeType = IeType::QosFlow;
    const FIXED_LEN: Option<usize> = Some(22);

    fn payload_len(&self) -> usize {
        22
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push(0);
        buf.push(self.five_qi.0);
        for rate in [self.mbr_ul, self.mbr_dl, self.gbr_ul, self.gbr_dl] {
            buf.extend_from_slice(&rate.to_be_bytes()[3..]);
        }
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        let _spare = r.read_u8()?;
        Ok(QosFlow {
            five_qi: FiveQi(r.read_u8()?),
            mbr_ul: r.read_u40_be()?,
            mbr_dl: r.read_u40_be()?,
            gbr_ul: r.read_u40_be()?,
            gbr_dl: r.read_u40_be()?,
        })
    }
}

fn expect_component(r: &mut Reader, expected: u8) -> Result<(), GtpcError> {
    let actual = r.read_u8()?;
    if actual != expected {
        return Err(GtpcError::WrongPacketFilterComponent { expected, actual });
    }
    Ok(())
}

fn encode_packet_filter(pf: &PacketFilter, buf: &mut Vec<u8>) {
    buf.push((u8::from(pf.direction) << 4) & 0x30);
    buf.push(PACKET_FILTER_CONTENTS_LEN as u8);
    buf.push(PF_IPV4_REMOTE_ADDRESS);
    buf.extend_from_slice(&pf.remote_address.octets());
    buf.extend_from_slice(&pf.remote_mask.octets());
    buf.push(PF_IPV4_LOCAL_ADDRESS);
    buf.extend_from_slice(&pf.local_address.octets());
    buf.extend_from_slice(&pf.local_mask.octets());
    buf.push(PF_LOCAL_PORT_RANGE);
    buf.extend_from_slice(&pf.local_port_start.to_be_bytes());
    buf.extend_from_slice(&pf.local_port_end.to_be_bytes());
    buf.push(PF_REMOTE_PORT_RANGE);
    buf.extend_from_slice(&pf.remote_port_start.to_be_bytes());
    buf.extend_from_slice(&pf.remote_port_end.to_be_bytes());
    buf.push(PF_TYPE_OF_SERVICE);
    buf.push(pf.type_of_service);
    buf.push(pf.type_of_service_mask);
}

fn decode_packet_filter(r: &mut Reader) -> Result<PacketFilter, GtpcError> {
    let direction = (r.read_u8()? & 0x30) >> 4;
    let direction = Direction::try_from(direction).map_err(|_| GtpcError::BadDirection(direction))?;
    let contents_len = r.read_u8()? as usize;
    if contents_len != PACKET_FILTER_CONTENTS_LEN {
        return Err(GtpcError::WrongIeLength {
            ie_type: IeType::QosRule.into(),
            expected: PACKET_FILTER_CONTENTS_LEN,
            actual: contents_len,
        });
    }
    expect_component(r, PF_IPV4_REMOTE_ADDRESS)?;
    let remote_address = r.read_ipv4()?;
    let remote_mask = r.read_ipv4()?;
    expect_component(r, PF_IPV4_LOCAL_ADDRESS)?;
    let local_address = r.read_ipv4()?;
    let local_mask = r.read_ipv4()?;
    expect_component(r, PF_LOCAL_PORT_RANGE)?;
    let local_port_start = r.read_u16_be()?;
    let local_port_end = r.read_u16_be()?;
    expect_component(r, PF_REMOTE_PORT_RANGE)?;
    let remote_port_start = r.read_u16_be()?;
    let remote_port_end = r.read_u16_be()?;
    expect_component(r, PF_TYPE_OF_SERVICE)?;
    let type_of_service = r.read_u8()?;
    let type_of_service_mask = r.read_u8()?;
    Ok(PacketFilter {
        direction,
        remote_address,
        remote_mask,
        local_address,
        local_mask,
        remote_port_start,
        remote_port_end,
        local_port_start,
        local_port_end,
        type_of_service,
        type_of_service_mask,
    })
}

impl InformationElement for QosRule {
    const IE_TYPE: IeType = IeType::QosRule;
    const FIXED_LEN: Option<usize> = None;

    fn payload_len(&self) -> usize {
        3 + self.packet_filters().len() * PACKET_FILTER_LEN
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push(self.precedence);
        buf.push(self.qfi & QFI_MASK);
        buf.push(CREATE_NEW_QOS_RULE | (self.packet_filters().len() as u8 & 0x1f));
        for pf in self.packet_filters() {
            encode_packet_filter(pf, buf);
        }
    }
    fn decode_payload(r: &mut Reader, len: usize) -> Result<Self, GtpcError> {
        let precedence = r.read_u8()?;
        let qfi = r.read_u8()? & QFI_MASK;
        let num_filters = (r.read_u8()? & 0x1f) as usize;
        if num_filters > MAX_PACKET_FILTERS {
            return Err(GtpcError::TooManyPacketFilters(num_filters));
        }
        let expected = 3 + num_filters * PACKET_FILTER_LEN;
        if len != expected {
            return Err(GtpcError::WrongIeLength {
                ie_type: Self::IE_TYPE.into(),
                expected,
                actual: len,
            });
        }
        let mut rule = QosRule::new(precedence, qfi);
        for _ in 0..num_filters {
            rule.add(decode_packet_filter(r)?)?;
        }
        Ok(rule)
    }
}

impl InformationElement for UliEcgi {
    const IE_TYPE: IeType = IeType::UliEcgi;
    const FIXED_LEN: Option<usize> = Some(8);

    fn payload_len(&self) -> usize {
        8
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push(ECGI_PRESENT);
        // PLMN is not modelled.
        buf.extend_from_slice(&[0, 0, 0]);
        buf.extend_from_slice(&(self.0 & ECI_MASK).to_be_bytes());
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        let _flags_and_plmn = r.take(4)?;
        Ok(UliEcgi(r.read_u32_be()? & ECI_MASK))
    }
}

impl InformationElement for Fteid {
    const IE_TYPE: IeType = IeType::Fteid;
    const FIXED_LEN: Option<usize> = Some(9);

    fn payload_len(&self) -> usize {
        9
    }
    fn encode_payload(&self, buf: &mut Vec<u8>) {
        buf.push(FTEID_IPV4 | (u8::from(self.interface_type) & INTERFACE_TYPE_MASK));
        buf.extend_from_slice(&self.teid.to_be_bytes());
        buf.extend_from_slice(&self.addr.octets());
    }
    fn decode_payload(r: &mut Reader, _len: usize) -> Result<Self, GtpcError> {
        let interface_type = r.read_u8()? & INTERFACE_TYPE_MASK;
        let interface_type = InterfaceType::try_from(interface_type)
            .map_err(|_| GtpcError::UnknownInterfaceType(interface_type))?;
        let teid = r.read_u32_be()?;
        let addr = r.read_ipv4()?;
        Ok(Fteid {
            interface_type,
            teid,
            addr,
        })
    }
}

/// Write the header of a flow context wrapper that encloses `len` bytes of nested IEs.
/// The length is little-endian, unlike every other IE.
pub(crate) fn encode_flow_context_header(buf: &mut Vec<u8>, len: usize) {
    buf.push(IeType::FlowContext.into());
    buf.extend_from_slice(&(len as u16).to_le_bytes());
    buf.push(0);
}

pub(crate) fn decode_flow_context_header(r: &mut Reader) -> Result<usize, GtpcError> {
    let ie_type = IeType::FlowContext.into();
    check_ie_type(r, ie_type)?;
    let len = r.read_u16_le()? as usize;
    check_instance(r, ie_type)?;
    Ok(len)
}
