//! The process control block.
//!
//! Field grouping mirrors the original layout: saved register context first,
//! then identity, then scheduling state, then the address space and stack,
//! then bookkeeping statistics and the parent/argv relationships.

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::AddressSpace;

pub const MAX_NAME_LENGTH: usize = 25;
pub const MAX_PCBS: usize = 64;

/// The integer register file saved/restored on every context switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuContext {
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub eip: u32,
    pub eflags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcbState {
    Stopped,
    Running,
    New,
    Blocked,
    Sleeping,
    Zombie,
    Cleaning,
}

impl PcbState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PcbState::Stopped => "stopped",
            PcbState::Running => "running",
            PcbState::New => "new",
            PcbState::Blocked => "blocked",
            PcbState::Sleeping => "sleeping",
            PcbState::Zombie => "zombie",
            PcbState::Cleaning => "cleaning",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PcbStats {
    pub kallocs: u32,
    pub preempts: u32,
    pub yields: u32,
    pub blocked_count: u32,
}

pub struct Pcb {
    pub ctx: CpuContext,
    pub kesp: u32,
    pub kebp: u32,
    pub is_process: bool,

    pub name: String,
    pub state: PcbState,
    pub pid: i16,
    pub sleep_until: u32,
    pub stackptr: u32,

    pub address_space: AddressSpace,
    pub data_size: u32,

    pub stats: PcbStats,

    pub current_directory: u32,
    pub argv: Vec<String>,

    pub parent: Option<i16>,
}

impl Pcb {
    pub fn new(pid: i16, name: String, is_process: bool) -> Self {
        Self {
            ctx: CpuContext::default(),
            kesp: 0,
            kebp: 0,
            is_process,
            name,
            state: PcbState::New,
            pid,
            sleep_until: 0,
            stackptr: 0,
            address_space: AddressSpace::new(),
            data_size: 0,
            stats: PcbStats::default(),
            current_directory: 0,
            argv: Vec::new(),
            parent: None,
        }
    }

    /// One-line diagnostic dump, used by `ps` and the panic handler.
    pub fn dbg_dump(&self) -> String {
        alloc::format!(
            "pid={} name={} state={} parent={:?} eip={:#x} esp={:#x}",
            self.pid,
            self.name,
            self.state.as_str(),
            self.parent,
            self.ctx.eip,
            self.ctx.esp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn new_pcb_starts_in_the_new_state() {
        let pcb = Pcb::new(1, "init".to_string(), true);
        assert_eq!(pcb.state, PcbState::New);
        assert_eq!(pcb.pid, 1);
    }
}
