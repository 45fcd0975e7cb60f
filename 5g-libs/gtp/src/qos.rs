//! qos - QoS rule, packet filter and QoS flow value types carried in GTP-C flow contexts

use crate::GtpcError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::Ipv4Addr;

/// Legacy constraint from TS24.008, 10.5.6.12.
pub const MAX_PACKET_FILTERS: usize = 16;

/// Highest value that fits in a 40 bit bit-rate field.
pub const MAX_BIT_RATE: u64 = (1 << 40) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Direction {
    Downlink = 1,
    Uplink = 2,
    Bidirectional = 3,
}

impl Direction {
    fn includes(self, other: Direction) -> bool {
        (u8::from(self) & u8::from(other)) != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFilter {
    pub direction: Direction,
    pub remote_address: Ipv4Addr,
    pub remote_mask: Ipv4Addr,
    pub local_address: Ipv4Addr,
    pub local_mask: Ipv4Addr,
    pub remote_port_start: u16,
    pub remote_port_end: u16,
    pub local_port_start: u16,
    pub local_port_end: u16,
    pub type_of_service: u8,
    pub type_of_service_mask: u8,
}

impl Default for PacketFilter {
    /// A filter that matches everything in both directions.
    fn default() -> Self {
        PacketFilter {
            direction: Direction::Bidirectional,
            remote_address: Ipv4Addr::UNSPECIFIED,
            remote_mask: Ipv4Addr::UNSPECIFIED,
            local_address: Ipv4Addr::UNSPECIFIED,
            local_mask: Ipv4Addr::UNSPECIFIED,
            remote_port_start: 0,
            remote_port_end: u16::MAX,
            local_port_start: 0,
            local_port_end: u16::MAX,
            type_of_service: 0,
            type_of_service_mask: 0,
        }
    }
}

fn masked_eq(a: Ipv4Addr, b: Ipv4Addr, mask: Ipv4Addr) -> bool {
    (u32::from(a) & u32::from(mask)) == (u32::from(b) & u32::from(mask))
}

impl PacketFilter {
    pub fn matches(
        &self,
        direction: Direction,
        remote_address: Ipv4Addr,
        local_address: Ipv4Addr,
        remote_port: u16,
        local_port: u16,
        type_of_service: u8,
    ) -> bool {
        self.direction.includes(direction)
            && masked_eq(self.remote_address, remote_address, self.remote_mask)
            && masked_eq(self.local_address, local_address, self.local_mask)
            && (self.remote_port_start..=self.remote_port_end).contains(&remote_port)
            && (self.local_port_start..=self.local_port_end).contains(&local_port)
            && (self.type_of_service & self.type_of_service_mask)
                == (type_of_service & self.type_of_service_mask)
    }
}

/// A precedence and QFI plus up to sixteen packet filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QosRule {
    pub precedence: u8,
    pub qfi: u8,
    packet_filters: Vec<PacketFilter>,
}

impl QosRule {
    pub fn new(precedence: u8, qfi: u8) -> Self {
        QosRule {
            precedence,
            qfi,
            packet_filters: vec![],
        }
    }

    /// Add a packet filter, returning its index within the rule.
    pub fn add(&mut self, filter: PacketFilter) -> Result<u8, GtpcError> {
        if self.packet_filters.len() >= MAX_PACKET_FILTERS {
            return Err(GtpcError::TooManyPacketFilters(self.packet_filters.len() + 1));
        }
        self.packet_filters.push(filter);
        Ok((self.packet_filters.len() - 1) as u8)
    }

    pub fn packet_filters(&self) -> &[PacketFilter] {
        &self.packet_filters
    }

    /// True if any of the rule's filters matches.
    pub fn matches(
        &self,
        direction: Direction,
        remote_address: Ipv4Addr,
        local_address: Ipv4Addr,
        remote_port: u16,
        local_port: u16,
        type_of_service: u8,
    ) -> bool {
        self.packet_filters.iter().any(|f| {
            f.matches(
                direction,
                remote_address,
                local_address,
                remote_port,
                local_port,
                type_of_service,
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Gbr,
    NonGbr,
    DelayCriticalGbr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveQiCharacteristics {
    pub resource_type: ResourceType,
    pub priority: u8,
    pub packet_delay_budget_ms: u16,
    pub packet_error_rate: f64,
}

/// 5G QoS identifier.  Values outside the standardized table are carried opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FiveQi(pub u8);

impl FiveQi {
    /// Standardized characteristics, TS23.501, table 5.7.4-1.
    pub fn characteristics(&self) -> Option<FiveQiCharacteristics> {
        use ResourceType::*;
        let (resource_type, priority, packet_delay_budget_ms, packet_error_rate) = match self.0 {
            1 => (Gbr, 20, 100, 1e-2),
            2 => (Gbr, 40, 150, 1e-3),
            3 => (Gbr, 30, 50, 1e-3),
            4 => (Gbr, 50, 300, 1e-6),
            65 => (Gbr, 7, 75, 1e-2),
            66 => (Gbr, 20, 100, 1e-2),
            67 => (Gbr, 15, 100, 1e-3),
            71 => (Gbr, 56, 150, 1e-6),
            72 => (Gbr, 56, 300, 1e-4),
            73 => (Gbr, 56, 300, 1e-8),
            74 => (Gbr, 56, 500, 1e-8),
            76 => (Gbr, 56, 500, 1e-4),
            5 => (NonGbr, 10, 100, 1e-6),
            6 => (NonGbr, 60, 300, 1e-6),
            7 => (NonGbr, 70, 100, 1e-3),
            8 => (NonGbr, 80, 300, 1e-6),
            9 => (NonGbr, 90, 300, 1e-6),
            69 => (NonGbr, 5, 60, 1e-6),
            70 => (NonGbr, 55, 200, 1e-6),
            79 => (NonGbr, 65, 50, 1e-2),
            80 => (NonGbr, 68, 10, 1e-6),
            82 => (DelayCriticalGbr, 19, 10, 1e-4),
            83 => (DelayCriticalGbr, 22, 10, 1e-4),
            84 => (DelayCriticalGbr, 24, 30, 1e-5),
            85 => (DelayCriticalGbr, 21, 5, 1e-5),
            86 => (DelayCriticalGbr, 18, 5, 1e-4),
            _ => return None,
        };
        Some(FiveQiCharacteristics {
            resource_type,
            priority,
            packet_delay_budget_ms,
            packet_error_rate,
        })
    }

    pub fn is_gbr(&self) -> bool {
        matches!(
            self.characteristics(),
            Some(FiveQiCharacteristics {
                resource_type: ResourceType::Gbr | ResourceType::DelayCriticalGbr,
                ..
            })
        )
    }
}

/// QoS characteristics negotiated for one flow.  Bit rates are in bit/s and are carried in
/// 40 bit fields on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QosFlow {
    pub five_qi: FiveQi,
    pub mbr_ul: u64,
    pub mbr_dl: u64,
    pub gbr_ul: u64,
    pub gbr_dl: u64,
}

impl QosFlow {
    pub fn non_gbr(five_qi: u8) -> Self {
        QosFlow {
            five_qi: FiveQi(five_qi),
            ..Default::default()
        }
    }

    /// Check that every bit rate fits its 40 bit wire field.
    pub fn validate(&self) -> Result<(), GtpcError> {
        match [self.mbr_ul, self.mbr_dl, self.gbr_ul, self.gbr_dl]
            .into_iter()
            .find(|rate| *rate > MAX_BIT_RATE)
        {
            Some(rate) => Err(GtpcError::BitRateOutOfRange(rate)),
            None => Ok(()),
        }
    }
}
