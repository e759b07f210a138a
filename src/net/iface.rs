//! The network interface table: a bounded (≤ 4) registry of interfaces,
//! with loopback preconfigured at `127.0.0.1/8`.

use alloc::string::String;

use crate::lib::error::Errno;
use crate::sync::Spinlock;

pub const MAX_INTERFACES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfaceState {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddr(pub [u8; 6]);

#[derive(Clone)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: u32,
    pub netmask: u32,
    pub gateway: u32,
    pub state: IfaceState,
}

fn loopback() -> Interface {
    Interface {
        name: String::from("lo"),
        mac: MacAddr::default(),
        ip: u32::from_be_bytes([127, 0, 0, 1]),
        netmask: u32::from_be_bytes([255, 0, 0, 0]),
        gateway: 0,
        state: IfaceState::Up,
    }
}

pub struct InterfaceTable {
    interfaces: [Option<Interface>; MAX_INTERFACES],
}

impl InterfaceTable {
    const NONE: Option<Interface> = None;

    pub const fn new() -> Self {
        Self {
            interfaces: [Self::NONE; MAX_INTERFACES],
        }
    }

    pub fn register(&mut self, iface: Interface) -> Result<usize, Errno> {
        let slot = self.interfaces.iter().position(Option::is_none).ok_or(Errno::Enodev)?;
        self.interfaces[slot] = Some(iface);
        Ok(slot)
    }

    pub fn get(&self, index: usize) -> Option<&Interface> {
        self.interfaces.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Interface> {
        self.interfaces.get_mut(index)?.as_mut()
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.interfaces.iter().position(|i| i.as_ref().map(|i| i.name.as_str()) == Some(name))
    }

    /// Administrative reconfiguration (spec §4.6: `net_configure_iface`).
    pub fn configure(&mut self, index: usize, ip: u32, netmask: u32, gateway: u32) -> Result<(), Errno> {
        let iface = self.get_mut(index).ok_or(Errno::Enodev)?;
        iface.ip = ip;
        iface.netmask = netmask;
        iface.gateway = gateway;
        Ok(())
    }

    pub fn mark_down(&mut self, index: usize) {
        if let Some(iface) = self.get_mut(index) {
            iface.state = IfaceState::Down;
        }
    }
}

impl Default for InterfaceTable {
    fn default() -> Self {
        Self::new()
    }
}

pub static INTERFACES: Spinlock<InterfaceTable> = Spinlock::new(InterfaceTable::new());

/// Install the loopback interface if it isn't already registered. The
/// table can't seed loopback in its `const fn new()` (building a `String`
/// isn't available in a const initializer), so the boot path calls this
/// once before anything else touches the interface table.
pub fn ensure_loopback() {
    let mut table = INTERFACES.lock();
    if table.find_by_name("lo").is_none() {
        let _ = table.register(loopback());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_preconfigured_with_127_0_0_1() {
        ensure_loopback();
        let table = INTERFACES.lock();
        let idx = table.find_by_name("lo").unwrap();
        let lo = table.get(idx).unwrap();
        assert_eq!(lo.ip, u32::from_be_bytes([127, 0, 0, 1]));
        assert_eq!(lo.state, IfaceState::Up);
    }

    #[test]
    fn registering_past_capacity_is_rejected() {
        let mut table = InterfaceTable::new();
        for i in 0..MAX_INTERFACES {
            table
                .register(Interface {
                    name: alloc::format!("eth{i}"),
                    mac: MacAddr::default(),
                    ip: 0,
                    netmask: 0,
                    gateway: 0,
                    state: IfaceState::Down,
                })
                .unwrap();
        }
        let result = table.register(loopback());
        assert!(result.is_err());
    }
}
