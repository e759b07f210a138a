//! Ethernet framing: a 14-byte header of destination MAC, source MAC, and
//! ethertype, big-endian on the wire.

use crate::lib::error::KernelError;

use super::iface::MacAddr;
use super::skb::{EtherType, Skb};

pub const HEADER_LEN: usize = 14;

pub struct EthHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: EtherType,
}

pub fn parse(skb: &mut Skb) -> Result<EthHeader, KernelError> {
    let buf = skb.eth_payload();
    if buf.len() < HEADER_LEN {
        return Err(KernelError::ProtocolViolation);
    }
    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&buf[0..6]);
    src.copy_from_slice(&buf[6..12]);
    let ethertype = u16::from_be_bytes([buf[12], buf[13]]);
    skb.ip_offset = Some(skb.eth_offset + HEADER_LEN);
    Ok(EthHeader {
        dst: MacAddr(dst),
        src: MacAddr(src),
        ethertype: EtherType::from_raw(ethertype),
    })
}

pub fn build(dst: MacAddr, src: MacAddr, ethertype: u16, payload: &[u8]) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&dst.0);
    out.extend_from_slice(&src.0);
    out.extend_from_slice(&ethertype.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips_addresses_and_ethertype() {
        let dst = MacAddr([1, 2, 3, 4, 5, 6]);
        let src = MacAddr([6, 5, 4, 3, 2, 1]);
        let frame = build(dst, src, 0x0800, &[0xaa, 0xbb]);
        let mut skb = Skb::new(frame, 0);
        let header = parse(&mut skb).unwrap();
        assert_eq!(header.dst, dst);
        assert_eq!(header.src, src);
        assert_eq!(header.ethertype, EtherType::Ip);
    }

    #[test]
    fn truncated_frame_is_a_protocol_violation() {
        let mut skb = Skb::new(alloc::vec![0u8; 4], 0);
        assert!(parse(&mut skb).is_err());
    }
}
