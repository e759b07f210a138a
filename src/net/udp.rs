//! UDP header parse/build and the pseudo-header checksum.

use alloc::vec::Vec;

use crate::lib::error::KernelError;

use super::checksum;
use super::skb::Skb;

pub const HEADER_LEN: usize = 8;

pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub payload_offset: usize,
}

pub fn parse(skb: &Skb, src_ip: u32, dst_ip: u32) -> Result<UdpHeader, KernelError> {
    let buf = skb.transport_payload().ok_or(KernelError::ProtocolViolation)?;
    if buf.len() < HEADER_LEN {
        return Err(KernelError::ProtocolViolation);
    }
    let src_port = u16::from_be_bytes([buf[0], buf[1]]);
    let dst_port = u16::from_be_bytes([buf[2], buf[3]]);
    let length = u16::from_be_bytes([buf[4], buf[5]]);
    if (length as usize) > buf.len() {
        return Err(KernelError::ProtocolViolation);
    }
    let segment = &buf[..length as usize];
    if checksum::transport_checksum(src_ip, dst_ip, 17, segment) != 0 {
        return Err(KernelError::ProtocolViolation);
    }
    Ok(UdpHeader {
        src_port,
        dst_port,
        length,
        payload_offset: skb.transport_offset.unwrap() + HEADER_LEN,
    })
}

pub fn build(src_ip: u32, dst_ip: u32, src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = (HEADER_LEN + payload.len()) as u16;
    let mut out = alloc::vec![0u8; HEADER_LEN + payload.len()];
    out[0..2].copy_from_slice(&src_port.to_be_bytes());
    out[2..4].copy_from_slice(&dst_port.to_be_bytes());
    out[4..6].copy_from_slice(&length.to_be_bytes());
    out[8..].copy_from_slice(payload);
    let sum = checksum::transport_checksum(src_ip, dst_ip, 17, &out);
    out[6..8].copy_from_slice(&sum.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips_ports_and_verifies_checksum() {
        let datagram = build(0x7f000001, 0x7f000001, 7, 9000, &[0x01, 0x02, 0x03]);
        let mut skb = Skb::new(datagram, 0);
        skb.transport_offset = Some(0);
        let hdr = parse(&skb, 0x7f000001, 0x7f000001).unwrap();
        assert_eq!(hdr.src_port, 7);
        assert_eq!(hdr.dst_port, 9000);
        let payload = &skb.data[hdr.payload_offset..];
        assert_eq!(payload, &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut datagram = build(0x7f000001, 0x7f000001, 7, 9000, &[0xaa]);
        datagram[6] ^= 0xff;
        let mut skb = Skb::new(datagram, 0);
        skb.transport_offset = Some(0);
        assert!(parse(&skb, 0x7f000001, 0x7f000001).is_err());
    }
}
