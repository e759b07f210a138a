//! ICMP: we only implement echo request/reply, the subset the spec's UDP
//! echo and ping scenarios exercise.

use alloc::vec::Vec;

use crate::lib::error::KernelError;

use super::checksum;
use super::skb::Skb;

const TYPE_ECHO_REPLY: u8 = 0;
const TYPE_ECHO_REQUEST: u8 = 8;

pub struct IcmpEcho {
    pub is_request: bool,
    pub identifier: u16,
    pub sequence: u16,
    pub payload_offset: usize,
}

pub fn parse(skb: &Skb) -> Result<IcmpEcho, KernelError> {
    let buf = skb.transport_payload().ok_or(KernelError::ProtocolViolation)?;
    if buf.len() < 8 {
        return Err(KernelError::ProtocolViolation);
    }
    if checksum::checksum(buf, 0) != 0 {
        return Err(KernelError::ProtocolViolation);
    }
    let icmp_type = buf[0];
    if icmp_type != TYPE_ECHO_REQUEST && icmp_type != TYPE_ECHO_REPLY {
        return Err(KernelError::NotSupported);
    }
    let identifier = u16::from_be_bytes([buf[4], buf[5]]);
    let sequence = u16::from_be_bytes([buf[6], buf[7]]);
    Ok(IcmpEcho {
        is_request: icmp_type == TYPE_ECHO_REQUEST,
        identifier,
        sequence,
        payload_offset: skb.transport_offset.unwrap() + 8,
    })
}

/// Build an echo reply carrying the same identifier/sequence/payload as
/// the request it answers.
pub fn build_echo_reply(echo: &IcmpEcho, payload: &[u8]) -> Vec<u8> {
    let mut out = alloc::vec![0u8; 8 + payload.len()];
    out[0] = TYPE_ECHO_REPLY;
    out[1] = 0;
    out[4..6].copy_from_slice(&echo.identifier.to_be_bytes());
    out[6..8].copy_from_slice(&echo.sequence.to_be_bytes());
    out[8..].copy_from_slice(payload);
    let sum = checksum::checksum(&out, 0);
    out[2..4].copy_from_slice(&sum.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_request(payload: &[u8]) -> Vec<u8> {
        let mut out = alloc::vec![0u8; 8 + payload.len()];
        out[0] = TYPE_ECHO_REQUEST;
        out[4..6].copy_from_slice(&7u16.to_be_bytes());
        out[6..8].copy_from_slice(&1u16.to_be_bytes());
        out[8..].copy_from_slice(payload);
        let sum = checksum::checksum(&out, 0);
        out[2..4].copy_from_slice(&sum.to_le_bytes());
        out
    }

    #[test]
    fn reply_echoes_identifier_sequence_and_payload() {
        let request = echo_request(&[1, 2, 3, 4]);
        let mut skb = Skb::new(request, 0);
        skb.transport_offset = Some(0);
        let echo = parse(&skb).unwrap();
        assert!(echo.is_request);
        let reply = build_echo_reply(&echo, &[1, 2, 3, 4]);
        assert_eq!(checksum::checksum(&reply, 0), 0);

        let mut reply_skb = Skb::new(reply, 0);
        reply_skb.transport_offset = Some(0);
        let reply_echo = parse(&reply_skb).unwrap();
        assert!(!reply_echo.is_request);
        assert_eq!(reply_echo.identifier, 7);
        assert_eq!(reply_echo.sequence, 1);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let mut request = echo_request(&[9]);
        request[2] ^= 0xff;
        let mut skb = Skb::new(request, 0);
        skb.transport_offset = Some(0);
        assert!(parse(&skb).is_err());
    }
}
