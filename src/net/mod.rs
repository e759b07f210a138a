//! Network stack: skbs, the per-protocol parsers (Ethernet/ARP/IPv4/ICMP/
//! UDP/TCP), interface table, sockets, and the rx/tx engine that ties them
//! together into the network kernel thread's main loop.

pub mod arp;
pub mod checksum;
pub mod engine;
pub mod eth;
pub mod iface;
pub mod icmp;
pub mod ip;
pub mod queue;
pub mod skb;
pub mod socket;
pub mod tcp;
pub mod udp;

pub use engine::{net_incoming_packet, net_send_skb};
pub use iface::{InterfaceTable, MacAddr, INTERFACES};
pub use skb::Skb;
pub use socket::{Socket, SocketType};
