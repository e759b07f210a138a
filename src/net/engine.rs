//! The rx/tx event loop: dequeues inbound frames, dispatches them through
//! the protocol stack, and drains the outbound queue to the device.
//!
//! IRQ context only ever calls [`net_incoming_packet`]; everything past
//! that (parsing, socket delivery, transmit) runs in the network kernel
//! thread so a slow parse never holds off the interrupt handler.

use alloc::sync::Arc;

use crate::lib::error::KernelError;

use super::arp;
use super::eth;
use super::icmp;
use super::iface::{InterfaceTable, MacAddr};
use super::ip;
use super::queue::SkbQueue;
use super::skb::{EtherType, IpProtocol, Skb, MAX_PACKET_SIZE};
use super::socket::{Datagram, Socket};
use super::tcp::{self, ConnectionState, TcpFlags};
use super::udp;

pub static RX_QUEUE: SkbQueue = SkbQueue::new();
pub static TX_QUEUE: SkbQueue = SkbQueue::new();

#[derive(Default)]
pub struct Counters {
    pub rx_dropped: core::sync::atomic::AtomicU32,
    pub tx_sent: core::sync::atomic::AtomicU32,
    pub tx_dropped: core::sync::atomic::AtomicU32,
}

pub static COUNTERS: Counters = Counters {
    rx_dropped: core::sync::atomic::AtomicU32::new(0),
    tx_sent: core::sync::atomic::AtomicU32::new(0),
    tx_dropped: core::sync::atomic::AtomicU32::new(0),
};

fn bump(counter: &core::sync::atomic::AtomicU32) {
    counter.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
}

/// Called from the device IRQ handler: read a frame and enqueue it. Must
/// never block or allocate without a bounded wait.
pub fn net_incoming_packet(iface: usize, raw: &[u8]) {
    let len = core::cmp::min(raw.len(), MAX_PACKET_SIZE);
    RX_QUEUE.enqueue(Skb::new(raw[..len].to_vec(), iface));
}

/// Enqueue an outbound skb built by higher-layer code.
pub fn net_send_skb(skb: Skb) {
    TX_QUEUE.enqueue(skb);
}

/// A UDP socket reachable by destination port, for the small set of ports
/// the kernel itself binds (bound user sockets are looked up the same way
/// through whatever table owns them; this map covers the demo/bootstrap
/// sockets created at boot).
pub struct UdpBindings {
    sockets: alloc::collections::BTreeMap<u16, Arc<Socket>>,
}

impl UdpBindings {
    pub const fn new() -> Self {
        Self {
            sockets: alloc::collections::BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, port: u16, socket: Arc<Socket>) {
        self.sockets.insert(port, socket);
    }

    pub fn get(&self, port: u16) -> Option<&Arc<Socket>> {
        self.sockets.get(&port)
    }
}

/// A listening stream socket reachable by local port, used to hand a newly
/// arrived connection's remote address to the socket's accept queue.
pub struct TcpBindings {
    sockets: alloc::collections::BTreeMap<u16, Arc<Socket>>,
}

impl TcpBindings {
    pub const fn new() -> Self {
        Self {
            sockets: alloc::collections::BTreeMap::new(),
        }
    }

    pub fn listen(&mut self, port: u16, socket: Arc<Socket>) {
        self.sockets.insert(port, socket);
    }

    pub fn get(&self, port: u16) -> Option<&Arc<Socket>> {
        self.sockets.get(&port)
    }
}

/// Process one received frame to completion: parse Ethernet, dispatch by
/// ethertype, then by IP protocol. Any parse failure drops the skb and
/// bumps the drop counter (spec §4.6).
pub fn process_one(
    mut skb: Skb,
    ifaces: &mut InterfaceTable,
    our_mac: MacAddr,
    udp_bindings: &UdpBindings,
    tcp_bindings: &TcpBindings,
    tcp_table: &mut tcp::ConnectionTable,
) -> Result<(), KernelError> {
    let eth_header = eth::parse(&mut skb)?;

    match eth_header.ethertype {
        EtherType::Arp => {
            let packet = arp::parse(&skb)?;
            if let Some(iface) = ifaces.get(skb.iface) {
                if let Some(reply) = arp::build_reply_if_targeting_us(&packet, our_mac, iface.ip) {
                    let frame = eth::build(eth_header.src, our_mac, 0x0806, &reply);
                    net_send_skb(Skb::new(frame, skb.iface));
                }
            }
            Ok(())
        }
        EtherType::Ip => {
            let ip_header = ip::parse(&mut skb)?;
            if !ip_header.checksum_ok {
                return Err(KernelError::ProtocolViolation);
            }
            match ip_header.protocol {
                IpProtocol::Icmp => {
                    let echo = icmp::parse(&skb)?;
                    if echo.is_request {
                        let payload = skb.data[echo.payload_offset..].to_vec();
                        let reply_icmp = icmp::build_echo_reply(&echo, &payload);
                        let reply_ip = ip::build(ip_header.dst, ip_header.src, IpProtocol::Icmp, reply_icmp.len() as u16, 0);
                        let mut reply_payload = reply_ip;
                        reply_payload.extend_from_slice(&reply_icmp);
                        let frame = eth::build(eth_header.src, our_mac, 0x0800, &reply_payload);
                        net_send_skb(Skb::new(frame, skb.iface));
                    }
                    Ok(())
                }
                IpProtocol::Udp => {
                    let udp_header = udp::parse(&skb, ip_header.src, ip_header.dst)?;
                    if let Some(socket) = udp_bindings.get(udp_header.dst_port) {
                        socket.deliver(Datagram {
                            src_ip: ip_header.src,
                            src_port: udp_header.src_port,
                            data: skb.data[udp_header.payload_offset..].to_vec(),
                        });
                    }
                    Ok(())
                }
                IpProtocol::Tcp => {
                    let header = super::tcp::parse(&skb, ip_header.src, ip_header.dst)?;
                    let dst_port = header.dst_port;
                    let src_port = header.src_port;
                    let had_syn = header.flags.contains(TcpFlags::SYN);
                    let state = tcp_table.process(ip_header.src, &header);
                    if had_syn && state == ConnectionState::SynReceived {
                        if let Some(socket) = tcp_bindings.get(dst_port) {
                            socket.note_incoming_connection(ip_header.src, src_port);
                        }
                    }
                    Ok(())
                }
                IpProtocol::Unknown(_) => Err(KernelError::ProtocolViolation),
            }
        }
        EtherType::Unknown(_) => Err(KernelError::NotSupported),
    }
}

/// Drain the rx queue, processing each skb to completion. This is the body
/// of the network kernel thread's main loop (spec §4.6); the caller is
/// expected to invoke it repeatedly, e.g. once per iteration of an idle or
/// dedicated network thread.
pub fn run_rx(
    ifaces: &mut InterfaceTable,
    our_mac: MacAddr,
    udp_bindings: &UdpBindings,
    tcp_bindings: &TcpBindings,
    tcp_table: &mut tcp::ConnectionTable,
) {
    while let Some(skb) = RX_QUEUE.dequeue() {
        if process_one(skb, ifaces, our_mac, udp_bindings, tcp_bindings, tcp_table).is_err() {
            bump(&COUNTERS.rx_dropped);
        }
    }
}

/// Drain the tx queue to `send`, the device's raw transmit function.
pub fn drain_tx(mut send: impl FnMut(&[u8]) -> Result<(), KernelError>) {
    while let Some(skb) = TX_QUEUE.dequeue() {
        match send(&skb.data) {
            Ok(()) => bump(&COUNTERS.tx_sent),
            Err(_) => bump(&COUNTERS.tx_dropped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::iface::{IfaceState, Interface};

    fn iface_table_with(ip: u32) -> InterfaceTable {
        let mut table = InterfaceTable::new();
        table
            .register(Interface {
                name: "eth0".into(),
                mac: MacAddr([0xaa; 6]),
                ip,
                netmask: 0xffff_ff00,
                gateway: 0,
                state: IfaceState::Up,
            })
            .unwrap();
        table
    }

    #[test]
    fn arp_request_for_our_ip_produces_a_queued_reply() {
        let mut ifaces = iface_table_with(0x0a000001);
        let our_mac = MacAddr([0xaa; 6]);
        let request = arp::build_request(MacAddr([0xbb; 6]), 0x0a000002, 0x0a000001);
        let frame = eth::build(MacAddr([0xff; 6]), MacAddr([0xbb; 6]), 0x0806, &request);
        let skb = Skb::new(frame, 0);
        let bindings = UdpBindings::new();
        let tcp_bindings = TcpBindings::new();
        let mut tcp_table = tcp::ConnectionTable::new();

        process_one(skb, &mut ifaces, our_mac, &bindings, &tcp_bindings, &mut tcp_table).unwrap();
        assert_eq!(TX_QUEUE.len(), 1);
        TX_QUEUE.dequeue();
    }

    #[test]
    fn udp_datagram_to_a_bound_port_is_delivered_to_the_socket() {
        let mut ifaces = iface_table_with(0x7f000001);
        let our_mac = MacAddr([0xaa; 6]);
        let datagram = udp::build(0x7f000001, 0x7f000001, 9000, 7, &[0x01, 0x02, 0x03]);
        let ip_hdr = ip::build(0x7f000001, 0x7f000001, IpProtocol::Udp, datagram.len() as u16, 1);
        let mut payload = ip_hdr;
        payload.extend_from_slice(&datagram);
        let frame = eth::build(our_mac, MacAddr([0xbb; 6]), 0x0800, &payload);
        let skb = Skb::new(frame, 0);

        let socket = Arc::new(Socket::new(super::super::socket::SocketType::Dgram));
        socket.bind(7).unwrap();
        let mut bindings = UdpBindings::new();
        bindings.bind(7, socket.clone());
        let tcp_bindings = TcpBindings::new();
        let mut tcp_table = tcp::ConnectionTable::new();

        process_one(skb, &mut ifaces, our_mac, &bindings, &tcp_bindings, &mut tcp_table).unwrap();
        let received = socket.recvfrom().unwrap();
        assert_eq!(received.data, alloc::vec![0x01, 0x02, 0x03]);
        assert_eq!(received.src_ip, 0x7f000001);
    }

    #[test]
    fn tcp_syn_to_a_listening_port_queues_a_pending_connection() {
        let mut ifaces = iface_table_with(0x0a000001);
        let our_mac = MacAddr([0xaa; 6]);
        let segment = tcp::build(0x0a000002, 0x0a000001, 5555, 80, 1, 0, TcpFlags::SYN, &[]);
        let ip_hdr = ip::build(0x0a000002, 0x0a000001, IpProtocol::Tcp, segment.len() as u16, 1);
        let mut payload = ip_hdr;
        payload.extend_from_slice(&segment);
        let frame = eth::build(our_mac, MacAddr([0xbb; 6]), 0x0800, &payload);
        let skb = Skb::new(frame, 0);

        let socket = Arc::new(Socket::new(super::super::socket::SocketType::Stream));
        socket.listen().unwrap();
        let udp_bindings = UdpBindings::new();
        let mut tcp_bindings = TcpBindings::new();
        tcp_bindings.listen(80, socket.clone());
        let mut tcp_table = tcp::ConnectionTable::new();
        tcp_table.listen(80);

        process_one(skb, &mut ifaces, our_mac, &udp_bindings, &tcp_bindings, &mut tcp_table).unwrap();
        assert_eq!(socket.accept().unwrap(), (0x0a000002, 5555));
    }
}
