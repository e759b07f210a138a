//! BSD-style socket subset: `socket`/`bind`/`connect`/`listen`/`accept`/
//! `send`/`recv`/`sendto`/`recvfrom` over UDP and TCP (spec §6.3).
//!
//! Open question resolved (spec §9): the receive queue behind `recvfrom`
//! is bounded per socket; `recvfrom` blocks the caller on a sleep-mutex
//! until a datagram arrives or the socket is shut down, and when the queue
//! is full a newly arriving datagram evicts the *oldest* buffered one
//! rather than being dropped itself, so a slow reader sees a sliding
//! window of recent traffic instead of getting stuck behind stale data.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU16, Ordering};

use crate::lib::error::Errno;
use crate::sync::SleepMutex;

use super::engine;
use super::eth;
use super::iface::{self, MacAddr};
use super::ip;
use super::skb::{IpProtocol, Skb};
use super::tcp::ConnectionState;
use super::udp;

pub const AF_INET: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Dgram,
    Stream,
}

const RECV_QUEUE_CAPACITY: usize = 16;
const ACCEPT_QUEUE_CAPACITY: usize = 4;

/// IANA ephemeral range start, used for datagram sockets that `send` through
/// without ever calling `bind`.
const FIRST_EPHEMERAL_PORT: u16 = 49152;

static NEXT_EPHEMERAL_PORT: AtomicU16 = AtomicU16::new(FIRST_EPHEMERAL_PORT);

fn next_ephemeral_port() -> u16 {
    let port = NEXT_EPHEMERAL_PORT.fetch_add(1, Ordering::Relaxed);
    if port < FIRST_EPHEMERAL_PORT {
        NEXT_EPHEMERAL_PORT.store(FIRST_EPHEMERAL_PORT, Ordering::Relaxed);
        FIRST_EPHEMERAL_PORT
    } else {
        port
    }
}

/// The interface a socket transmits through. Only loopback is guaranteed to
/// exist, so that's what an outgoing packet with no more specific route uses.
fn egress_interface() -> Result<(usize, MacAddr, u32), Errno> {
    let table = iface::INTERFACES.lock();
    let index = table.find_by_name("lo").ok_or(Errno::Enodev)?;
    let lo = table.get(index).unwrap();
    Ok((index, lo.mac, lo.ip))
}

pub struct Datagram {
    pub src_ip: u32,
    pub src_port: u16,
    pub data: Vec<u8>,
}

struct SocketState {
    socket_type: SocketType,
    local_port: Option<u16>,
    remote: Option<(u32, u16)>,
    recv_queue: VecDeque<Datagram>,
    accept_queue: VecDeque<(u32, u16)>,
    tcp_state: ConnectionState,
    shutdown: bool,
}

/// One socket's mutable state, guarded by a sleep-mutex so `recvfrom` can
/// block the caller rather than spin.
pub struct Socket {
    state: SleepMutex<SocketState>,
}

impl Socket {
    pub fn new(socket_type: SocketType) -> Self {
        Self {
            state: SleepMutex::new(SocketState {
                socket_type,
                local_port: None,
                remote: None,
                recv_queue: VecDeque::new(),
                accept_queue: VecDeque::new(),
                tcp_state: ConnectionState::Closed,
                shutdown: false,
            }),
        }
    }

    pub fn bind(&self, port: u16) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.local_port = Some(port);
        Ok(())
    }

    pub fn connect(&self, ip: u32, port: u16) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.remote = Some((ip, port));
        Ok(())
    }

    pub fn listen(&self) -> Result<(), Errno> {
        let mut state = self.state.lock();
        if state.socket_type != SocketType::Stream {
            return Err(Errno::Einval);
        }
        state.tcp_state = ConnectionState::Listen;
        Ok(())
    }

    pub fn local_port(&self) -> Option<u16> {
        self.state.lock().local_port
    }

    /// Deliver a received datagram; evicts the oldest buffered one if the
    /// queue is already at capacity.
    pub fn deliver(&self, datagram: Datagram) {
        let mut state = self.state.lock();
        if state.recv_queue.len() >= RECV_QUEUE_CAPACITY {
            state.recv_queue.pop_front();
        }
        state.recv_queue.push_back(datagram);
    }

    /// Block until a datagram is available or the socket is shut down.
    pub fn recvfrom(&self) -> Result<Datagram, Errno> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(datagram) = state.recv_queue.pop_front() {
                    return Ok(datagram);
                }
                if state.shutdown {
                    return Err(Errno::Eagain);
                }
            }
            if let Some(pid) = crate::process::current::current_pid() {
                crate::process::scheduler::block_current();
                let _ = pid;
            } else {
                return Err(Errno::Eagain);
            }
        }
    }

    pub fn recv(&self) -> Result<Vec<u8>, Errno> {
        self.recvfrom().map(|d| d.data)
    }

    /// Build and transmit one UDP datagram to `dst_ip`/`dst_port`. A socket
    /// that hasn't called `bind` is implicitly bound to an ephemeral port
    /// first, matching BSD `sendto` on an unbound datagram socket.
    pub fn sendto(&self, dst_ip: u32, dst_port: u16, payload: &[u8]) -> Result<(), Errno> {
        let src_port = {
            let mut state = self.state.lock();
            if state.socket_type != SocketType::Dgram {
                return Err(Errno::Einval);
            }
            match state.local_port {
                Some(port) => port,
                None => {
                    let port = next_ephemeral_port();
                    state.local_port = Some(port);
                    port
                }
            }
        };

        let (iface_index, mac, src_ip) = egress_interface()?;
        let datagram = udp::build(src_ip, dst_ip, src_port, dst_port, payload);
        let ip_packet = ip::build(src_ip, dst_ip, IpProtocol::Udp, datagram.len() as u16, 0);
        let mut frame_payload = ip_packet;
        frame_payload.extend_from_slice(&datagram);
        let frame = eth::build(mac, mac, 0x0800, &frame_payload);
        engine::net_send_skb(Skb::new(frame, iface_index));
        Ok(())
    }

    /// `send` on a connected datagram socket: uses the address passed to
    /// `connect` as the destination.
    pub fn send(&self, payload: &[u8]) -> Result<(), Errno> {
        let remote = self.state.lock().remote.ok_or(Errno::Einval)?;
        self.sendto(remote.0, remote.1, payload)
    }

    /// Record an inbound connection request against a listening stream
    /// socket, evicting the oldest pending one if the backlog is full.
    pub fn note_incoming_connection(&self, remote_ip: u32, remote_port: u16) {
        let mut state = self.state.lock();
        if state.accept_queue.len() >= ACCEPT_QUEUE_CAPACITY {
            state.accept_queue.pop_front();
        }
        state.accept_queue.push_back((remote_ip, remote_port));
    }

    /// Block until a pending connection is available on a listening stream
    /// socket, returning its remote address.
    pub fn accept(&self) -> Result<(u32, u16), Errno> {
        loop {
            {
                let mut state = self.state.lock();
                if state.socket_type != SocketType::Stream || state.tcp_state != ConnectionState::Listen {
                    return Err(Errno::Einval);
                }
                if let Some(pending) = state.accept_queue.pop_front() {
                    return Ok(pending);
                }
                if state.shutdown {
                    return Err(Errno::Eagain);
                }
            }
            if crate::process::current::current_pid().is_some() {
                crate::process::scheduler::block_current();
            } else {
                return Err(Errno::Eagain);
            }
        }
    }

    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
    }

    pub fn tcp_state(&self) -> ConnectionState {
        self.state.lock().tcp_state
    }

    pub fn set_tcp_state(&self, new_state: ConnectionState) {
        self.state.lock().tcp_state = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recvfrom_returns_the_first_queued_datagram() {
        let socket = Socket::new(SocketType::Dgram);
        socket.bind(7).unwrap();
        socket.deliver(Datagram { src_ip: 0x7f000001, src_port: 9000, data: alloc::vec![1, 2, 3] });
        let datagram = socket.recvfrom().unwrap();
        assert_eq!(datagram.data, alloc::vec![1, 2, 3]);
        assert_eq!(datagram.src_ip, 0x7f000001);
    }

    #[test]
    fn full_receive_queue_drops_the_oldest_datagram_not_the_newest() {
        let socket = Socket::new(SocketType::Dgram);
        for i in 0..RECV_QUEUE_CAPACITY + 1 {
            socket.deliver(Datagram { src_ip: 0, src_port: 0, data: alloc::vec![i as u8] });
        }
        let first = socket.recvfrom().unwrap();
        assert_eq!(first.data, alloc::vec![1u8]);
    }

    #[test]
    fn shutdown_unblocks_recvfrom_with_an_error_instead_of_hanging() {
        let socket = Socket::new(SocketType::Dgram);
        socket.shutdown();
        assert!(matches!(socket.recvfrom(), Err(Errno::Eagain)));
    }

    #[test]
    fn sendto_on_an_unbound_socket_assigns_an_ephemeral_port_and_queues_a_frame() {
        iface::ensure_loopback();
        let before = super::super::engine::TX_QUEUE.len();
        let socket = Socket::new(SocketType::Dgram);
        assert!(socket.local_port().is_none());
        socket.sendto(0x7f000001, 9000, &[1, 2, 3]).unwrap();
        assert!(socket.local_port().unwrap() >= FIRST_EPHEMERAL_PORT);
        assert_eq!(super::super::engine::TX_QUEUE.len(), before + 1);
        super::super::engine::TX_QUEUE.dequeue();
    }

    #[test]
    fn send_without_connect_is_rejected() {
        iface::ensure_loopback();
        let socket = Socket::new(SocketType::Dgram);
        assert_eq!(socket.send(&[1]), Err(Errno::Einval));
    }

    #[test]
    fn send_after_connect_uses_the_connected_address() {
        iface::ensure_loopback();
        let before = super::super::engine::TX_QUEUE.len();
        let socket = Socket::new(SocketType::Dgram);
        socket.connect(0x7f000001, 7).unwrap();
        socket.send(&[9]).unwrap();
        assert_eq!(super::super::engine::TX_QUEUE.len(), before + 1);
        super::super::engine::TX_QUEUE.dequeue();
    }

    #[test]
    fn accept_returns_a_queued_connection_for_a_listening_socket() {
        let socket = Socket::new(SocketType::Stream);
        socket.listen().unwrap();
        socket.note_incoming_connection(0x0a000001, 5555);
        assert_eq!(socket.accept().unwrap(), (0x0a000001, 5555));
    }

    #[test]
    fn accept_on_a_non_listening_socket_is_rejected() {
        let socket = Socket::new(SocketType::Stream);
        assert_eq!(socket.accept(), Err(Errno::Einval));
    }
}
