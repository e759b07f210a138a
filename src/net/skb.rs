//! Socket buffers: the packet scratch space that flows through the rx/tx
//! queues and the per-protocol parsers.

use alloc::vec::Vec;

pub const MAX_PACKET_SIZE: usize = 0x600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    Ip,
    Arp,
    Unknown(u16),
}

impl EtherType {
    pub fn from_raw(v: u16) -> Self {
        match v {
            0x0800 => EtherType::Ip,
            0x0806 => EtherType::Arp,
            other => EtherType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Icmp,
    Udp,
    Tcp,
    Unknown(u8),
}

impl IpProtocol {
    pub fn from_raw(v: u8) -> Self {
        match v {
            1 => IpProtocol::Icmp,
            17 => IpProtocol::Udp,
            6 => IpProtocol::Tcp,
            other => IpProtocol::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            IpProtocol::Icmp => 1,
            IpProtocol::Udp => 17,
            IpProtocol::Tcp => 6,
            IpProtocol::Unknown(v) => v,
        }
    }
}

/// A received or about-to-be-sent frame, plus the layer offsets discovered
/// while parsing it.
pub struct Skb {
    pub data: Vec<u8>,
    pub iface: usize,
    pub eth_offset: usize,
    pub ip_offset: Option<usize>,
    pub transport_offset: Option<usize>,
}

impl Skb {
    pub fn new(data: Vec<u8>, iface: usize) -> Self {
        Self {
            data,
            iface,
            eth_offset: 0,
            ip_offset: None,
            transport_offset: None,
        }
    }

    pub fn eth_payload(&self) -> &[u8] {
        &self.data[self.eth_offset..]
    }

    pub fn ip_payload(&self) -> Option<&[u8]> {
        self.ip_offset.map(|o| &self.data[o..])
    }

    pub fn transport_payload(&self) -> Option<&[u8]> {
        self.transport_offset.map(|o| &self.data[o..])
    }
}
