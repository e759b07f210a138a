//! The process table: a fixed-size slot array rather than the original's
//! intrusive linked list, per the queue design note in
//! [`crate::process::queue`] — a `Pcb` only ever lives in one place, and
//! queues reference it by table index.

use alloc::string::String;

use crate::lib::error::Errno;
use crate::sync::Spinlock;

use super::pcb::{Pcb, MAX_PCBS};

pub struct PcbTable {
    slots: [Option<Pcb>; MAX_PCBS],
    next_pid: i16,
}

impl PcbTable {
    const EMPTY: Option<Pcb> = None;

    const fn new() -> Self {
        Self {
            slots: [Self::EMPTY; MAX_PCBS],
            next_pid: 1,
        }
    }

    /// Allocate a new slot, assigning the next pid. Returns the table index.
    pub fn insert(&mut self, name: String, is_process: bool) -> Result<usize, Errno> {
        let index = self.slots.iter().position(Option::is_none).ok_or(Errno::Emfile)?;
        let pid = self.next_pid;
        self.next_pid = self.next_pid.checked_add(1).unwrap_or(1);
        self.slots[index] = Some(Pcb::new(pid, name, is_process));
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&Pcb> {
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Pcb> {
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn find_by_pid(&self, pid: i16) -> Option<usize> {
        self.slots
            .iter()
            .position(|p| p.as_ref().map(|p| p.pid) == Some(pid))
    }

    /// Remove and drop the slot, releasing its address space.
    pub fn remove(&mut self, index: usize) -> Option<Pcb> {
        self.slots.get_mut(index)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub static PCB_TABLE: Spinlock<PcbTable> = Spinlock::new(PcbTable::new());

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn insert_assigns_increasing_pids() {
        let mut table = PcbTable::new();
        let a = table.insert("a".to_string(), true).unwrap();
        let b = table.insert("b".to_string(), true).unwrap();
        assert!(table.get(a).unwrap().pid < table.get(b).unwrap().pid);
    }

    #[test]
    fn table_rejects_insert_past_capacity() {
        let mut table = PcbTable::new();
        for i in 0..MAX_PCBS {
            table.insert(alloc::format!("p{i}"), true).unwrap();
        }
        assert_eq!(table.insert("overflow".to_string(), true), Err(Errno::Emfile));
    }

    #[test]
    fn remove_frees_the_slot_for_reuse() {
        let mut table = PcbTable::new();
        let idx = table.insert("a".to_string(), true).unwrap();
        table.remove(idx);
        assert!(table.get(idx).is_none());
    }
}
