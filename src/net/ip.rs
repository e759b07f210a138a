//! IPv4 header parsing and construction. No fragmentation or options
//! support — the header is always exactly 20 bytes, matching the spec's
//! non-goals (no IPv6/TLS, no demand paging-adjacent complexity creep).

use alloc::vec::Vec;

use crate::lib::error::KernelError;

use super::checksum;
use super::skb::{IpProtocol, Skb};

pub const HEADER_LEN: usize = 20;

pub struct IpHeader {
    pub version_ihl: u8,
    pub total_length: u16,
    pub protocol: IpProtocol,
    pub src: u32,
    pub dst: u32,
    pub checksum_ok: bool,
}

pub fn parse(skb: &mut Skb) -> Result<IpHeader, KernelError> {
    let buf = skb.ip_payload().ok_or(KernelError::ProtocolViolation)?;
    if buf.len() < HEADER_LEN {
        return Err(KernelError::ProtocolViolation);
    }
    let version_ihl = buf[0];
    let ihl = (version_ihl & 0x0f) as usize * 4;
    if ihl < HEADER_LEN || buf.len() < ihl {
        return Err(KernelError::ProtocolViolation);
    }
    let total_length = u16::from_be_bytes([buf[2], buf[3]]);
    let protocol = IpProtocol::from_raw(buf[9]);
    let src = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
    let dst = u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]);
    let checksum_ok = checksum::checksum(&buf[..ihl], 0) == 0;

    let ip_offset = skb.ip_offset.unwrap();
    skb.transport_offset = Some(ip_offset + ihl);

    Ok(IpHeader {
        version_ihl,
        total_length,
        protocol,
        src,
        dst,
        checksum_ok,
    })
}

/// Build a 20-byte IPv4 header (no options) with a correct checksum.
pub fn build(src: u32, dst: u32, protocol: IpProtocol, payload_len: u16, ident: u16) -> Vec<u8> {
    let mut hdr = alloc::vec![0u8; HEADER_LEN];
    hdr[0] = 0x45; // version 4, IHL 5
    hdr[1] = 0;
    let total_length = HEADER_LEN as u16 + payload_len;
    hdr[2..4].copy_from_slice(&total_length.to_be_bytes());
    hdr[4..6].copy_from_slice(&ident.to_be_bytes());
    hdr[6..8].copy_from_slice(&0u16.to_be_bytes());
    hdr[8] = 64; // TTL
    hdr[9] = protocol.as_u8();
    hdr[10..12].copy_from_slice(&0u16.to_be_bytes());
    hdr[12..16].copy_from_slice(&src.to_be_bytes());
    hdr[16..20].copy_from_slice(&dst.to_be_bytes());
    let sum = checksum::checksum(&hdr, 0);
    hdr[10..12].copy_from_slice(&sum.to_le_bytes());
    hdr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_header_has_a_verifying_checksum() {
        let hdr = build(0x7f000001, 0x7f000001, IpProtocol::Udp, 8, 1);
        assert_eq!(checksum::checksum(&hdr, 0), 0);
    }

    #[test]
    fn parse_extracts_addresses_and_protocol() {
        let hdr_bytes = build(0x0a000001, 0x0a000002, IpProtocol::Tcp, 0, 1);
        let mut skb = Skb::new(hdr_bytes, 0);
        skb.ip_offset = Some(0);
        let parsed = parse(&mut skb).unwrap();
        assert_eq!(parsed.src, 0x0a000001);
        assert_eq!(parsed.dst, 0x0a000002);
        assert_eq!(parsed.protocol, IpProtocol::Tcp);
        assert!(parsed.checksum_ok);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let mut skb = Skb::new(alloc::vec![0x45u8; 10], 0);
        skb.ip_offset = Some(0);
        assert!(parse(&mut skb).is_err());
    }
}
