//! TCP segment parsing and a minimal per-connection table.
//!
//! The spec scopes TCP to "process the segment against the connection
//! table if present" — there's no retransmission, congestion control, or
//! full state machine here, just enough to demultiplex segments to a
//! listening or established socket.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::lib::error::KernelError;

use super::checksum;
use super::skb::Skb;

pub const MIN_HEADER_LEN: usize = 20;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TcpFlags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
    }
}

pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub payload_offset: usize,
}

pub fn parse(skb: &Skb, src_ip: u32, dst_ip: u32) -> Result<TcpHeader, KernelError> {
    let buf = skb.transport_payload().ok_or(KernelError::ProtocolViolation)?;
    if buf.len() < MIN_HEADER_LEN {
        return Err(KernelError::ProtocolViolation);
    }
    let data_offset = ((buf[12] >> 4) as usize) * 4;
    if data_offset < MIN_HEADER_LEN || buf.len() < data_offset {
        return Err(KernelError::ProtocolViolation);
    }
    if checksum::transport_checksum(src_ip, dst_ip, 6, buf) != 0 {
        return Err(KernelError::ProtocolViolation);
    }
    let src_port = u16::from_be_bytes([buf[0], buf[1]]);
    let dst_port = u16::from_be_bytes([buf[2], buf[3]]);
    let seq = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let ack = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let flags = TcpFlags::from_bits_truncate(buf[13]);

    Ok(TcpHeader {
        src_port,
        dst_port,
        seq,
        ack,
        flags,
        payload_offset: skb.transport_offset.unwrap() + data_offset,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub local_port: u16,
    pub remote_ip: u32,
    pub remote_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Listen,
    SynReceived,
    Established,
    CloseWait,
    Closed,
}

pub struct ConnectionTable {
    connections: BTreeMap<ConnectionKey, ConnectionState>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
        }
    }

    pub fn listen(&mut self, local_port: u16) {
        self.connections.insert(
            ConnectionKey { local_port, remote_ip: 0, remote_port: 0 },
            ConnectionState::Listen,
        );
    }

    /// Demultiplex a segment against the table, advancing connection state
    /// for the handful of transitions this subset needs (SYN -> SynReceived
    /// on a listening port, ACK -> Established, FIN -> CloseWait).
    pub fn process(&mut self, remote_ip: u32, header: &TcpHeader) -> ConnectionState {
        let key = ConnectionKey {
            local_port: header.dst_port,
            remote_ip,
            remote_port: header.src_port,
        };
        let listen_key = ConnectionKey { local_port: header.dst_port, remote_ip: 0, remote_port: 0 };

        if header.flags.contains(TcpFlags::SYN) && self.connections.contains_key(&listen_key) {
            self.connections.insert(key, ConnectionState::SynReceived);
            return ConnectionState::SynReceived;
        }

        let state = self.connections.entry(key).or_insert(ConnectionState::Closed);
        if header.flags.contains(TcpFlags::FIN) {
            *state = ConnectionState::CloseWait;
        } else if header.flags.contains(TcpFlags::ACK) && *state == ConnectionState::SynReceived {
            *state = ConnectionState::Established;
        }
        *state
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build(
    src_ip: u32,
    dst_ip: u32,
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: TcpFlags,
    payload: &[u8],
) -> Vec<u8> {
    let mut out = alloc::vec![0u8; MIN_HEADER_LEN + payload.len()];
    out[0..2].copy_from_slice(&src_port.to_be_bytes());
    out[2..4].copy_from_slice(&dst_port.to_be_bytes());
    out[4..8].copy_from_slice(&seq.to_be_bytes());
    out[8..12].copy_from_slice(&ack.to_be_bytes());
    out[12] = ((MIN_HEADER_LEN / 4) as u8) << 4;
    out[13] = flags.bits();
    out[14..16].copy_from_slice(&4096u16.to_be_bytes());
    out[MIN_HEADER_LEN..].copy_from_slice(payload);
    let sum = checksum::transport_checksum(src_ip, dst_ip, 6, &out);
    out[16..18].copy_from_slice(&sum.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syn_on_a_listening_port_transitions_to_syn_received() {
        let mut table = ConnectionTable::new();
        table.listen(80);
        let segment = build(0x0a000002, 0x0a000001, 5555, 80, 1, 0, TcpFlags::SYN, &[]);
        let mut skb = Skb::new(segment, 0);
        skb.transport_offset = Some(0);
        let header = parse(&skb, 0x0a000002, 0x0a000001).unwrap();
        let state = table.process(0x0a000002, &header);
        assert_eq!(state, ConnectionState::SynReceived);
    }

    #[test]
    fn ack_after_syn_received_reaches_established() {
        let mut table = ConnectionTable::new();
        table.listen(80);
        let syn = build(0x0a000002, 0x0a000001, 5555, 80, 1, 0, TcpFlags::SYN, &[]);
        let mut syn_skb = Skb::new(syn, 0);
        syn_skb.transport_offset = Some(0);
        let syn_header = parse(&syn_skb, 0x0a000002, 0x0a000001).unwrap();
        table.process(0x0a000002, &syn_header);

        let ack = build(0x0a000002, 0x0a000001, 5555, 80, 2, 2, TcpFlags::ACK, &[]);
        let mut ack_skb = Skb::new(ack, 0);
        ack_skb.transport_offset = Some(0);
        let ack_header = parse(&ack_skb, 0x0a000002, 0x0a000001).unwrap();
        assert_eq!(table.process(0x0a000002, &ack_header), ConnectionState::Established);
    }
}
