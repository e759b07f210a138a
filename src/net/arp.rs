//! ARP request/reply handling: resolve IPv4 addresses to MAC addresses on
//! the local segment, and answer requests for our own address.

use alloc::vec::Vec;

use crate::lib::error::KernelError;

use super::iface::MacAddr;
use super::skb::Skb;

pub const HEADER_LEN: usize = 28;
const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;
const OP_REQUEST: u16 = 1;
const OP_REPLY: u16 = 2;

pub struct ArpPacket {
    pub operation: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: u32,
    pub target_mac: MacAddr,
    pub target_ip: u32,
}

pub fn parse(skb: &Skb) -> Result<ArpPacket, KernelError> {
    let buf = skb.ip_payload().ok_or(KernelError::ProtocolViolation)?;
    if buf.len() < HEADER_LEN {
        return Err(KernelError::ProtocolViolation);
    }
    let htype = u16::from_be_bytes([buf[0], buf[1]]);
    let ptype = u16::from_be_bytes([buf[2], buf[3]]);
    if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 {
        return Err(KernelError::ProtocolViolation);
    }
    let operation = u16::from_be_bytes([buf[6], buf[7]]);
    let mut sender_mac = [0u8; 6];
    sender_mac.copy_from_slice(&buf[8..14]);
    let sender_ip = u32::from_be_bytes([buf[14], buf[15], buf[16], buf[17]]);
    let mut target_mac = [0u8; 6];
    target_mac.copy_from_slice(&buf[18..24]);
    let target_ip = u32::from_be_bytes([buf[24], buf[25], buf[26], buf[27]]);

    Ok(ArpPacket {
        operation,
        sender_mac: MacAddr(sender_mac),
        sender_ip,
        target_mac: MacAddr(target_mac),
        target_ip,
    })
}

fn build(operation: u16, sender_mac: MacAddr, sender_ip: u32, target_mac: MacAddr, target_ip: u32) -> Vec<u8> {
    let mut out = alloc::vec![0u8; HEADER_LEN];
    out[0..2].copy_from_slice(&HTYPE_ETHERNET.to_be_bytes());
    out[2..4].copy_from_slice(&PTYPE_IPV4.to_be_bytes());
    out[4] = 6;
    out[5] = 4;
    out[6..8].copy_from_slice(&operation.to_be_bytes());
    out[8..14].copy_from_slice(&sender_mac.0);
    out[14..18].copy_from_slice(&sender_ip.to_be_bytes());
    out[18..24].copy_from_slice(&target_mac.0);
    out[24..28].copy_from_slice(&target_ip.to_be_bytes());
    out
}

pub fn build_request(our_mac: MacAddr, our_ip: u32, target_ip: u32) -> Vec<u8> {
    build(OP_REQUEST, our_mac, our_ip, MacAddr::default(), target_ip)
}

/// If `packet` is a request for `our_ip`, build the reply frame payload
/// (ARP header only — the caller wraps it in an Ethernet frame addressed
/// back to the requester).
pub fn build_reply_if_targeting_us(packet: &ArpPacket, our_mac: MacAddr, our_ip: u32) -> Option<Vec<u8>> {
    if packet.operation != OP_REQUEST || packet.target_ip != our_ip {
        return None;
    }
    Some(build(OP_REPLY, our_mac, our_ip, packet.sender_mac, packet.sender_ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_built_only_for_requests_targeting_our_ip() {
        let our_mac = MacAddr([0xaa; 6]);
        let our_ip = 0x0a000001;
        let request = build_request(MacAddr([0xbb; 6]), 0x0a000002, our_ip);
        let mut skb = Skb::new(request, 0);
        skb.ip_offset = Some(0);
        let parsed = parse(&skb).unwrap();
        let reply = build_reply_if_targeting_us(&parsed, our_mac, our_ip).unwrap();
        let mut reply_skb = Skb::new(reply, 0);
        reply_skb.ip_offset = Some(0);
        let reply_parsed = parse(&reply_skb).unwrap();
        assert_eq!(reply_parsed.sender_mac, our_mac);
        assert_eq!(reply_parsed.target_ip, 0x0a000002);
    }

    #[test]
    fn request_for_someone_else_produces_no_reply() {
        let request = build_request(MacAddr([0xbb; 6]), 0x0a000002, 0x0a000099);
        let mut skb = Skb::new(request, 0);
        skb.ip_offset = Some(0);
        let parsed = parse(&skb).unwrap();
        assert!(build_reply_if_targeting_us(&parsed, MacAddr([0xaa; 6]), 0x0a000001).is_none());
    }
}
