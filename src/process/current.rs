//! The currently running process, tracked per core.
//!
//! A real SMP build would key this off the APIC id; this crate targets a
//! single core, so one atomic slot is enough (spec §9 design note).

use alloc::string::String;
use core::sync::atomic::{AtomicI32, Ordering};

const NONE_PID: i32 = -1;

static CURRENT_PID: AtomicI32 = AtomicI32::new(NONE_PID);

pub fn set_current(pid: i16) {
    CURRENT_PID.store(pid as i32, Ordering::Release);
}

pub fn clear_current() {
    CURRENT_PID.store(NONE_PID, Ordering::Release);
}

pub fn current_pid() -> Option<i16> {
    let raw = CURRENT_PID.load(Ordering::Acquire);
    if raw == NONE_PID {
        None
    } else {
        Some(raw as i16)
    }
}

/// A point-in-time copy of the running process's diagnostic state, taken
/// without holding the table lock across the call site (the panic handler
/// may run with the lock already contended).
pub struct PcbSnapshot {
    dump: String,
}

impl PcbSnapshot {
    pub fn dbg_dump(&self) -> &str {
        &self.dump
    }
}

pub fn try_current() -> Option<PcbSnapshot> {
    let pid = current_pid()?;
    let table = super::table::PCB_TABLE.try_lock()?;
    let index = table.find_by_pid(pid)?;
    let pcb = table.get(index)?;
    Some(PcbSnapshot {
        dump: pcb.dbg_dump(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_current_process_by_default() {
        clear_current();
        assert_eq!(current_pid(), None);
        assert!(try_current().is_none());
    }
}
