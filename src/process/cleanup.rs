//! Zombie reaping.
//!
//! A process that calls `exit` is marked [`PcbState::Zombie`] but keeps its
//! table slot (and address space) until its parent reaps it, or forever if
//! orphaned — matching the original's `pcb_cleanup_routine`, except reaping
//! here also runs for orphans rather than leaking the slot.

use super::pcb::PcbState;
use super::table::PCB_TABLE;

/// Reap every zombie whose parent is `reaper_pid`, or every zombie at all
/// when `reaper_pid` is `None` (orphan sweep, run periodically).
pub fn reap(reaper_pid: Option<i16>) -> usize {
    let mut table = PCB_TABLE.lock();
    let targets: alloc::vec::Vec<usize> = table
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.state == PcbState::Zombie
                && match reaper_pid {
                    Some(parent) => p.parent == Some(parent),
                    None => true,
                }
        })
        .map(|(i, _)| i)
        .collect();

    for index in &targets {
        if let Some(mut pcb) = table.remove(*index) {
            pcb.address_space.cleanup();
        }
    }
    targets.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn reap_removes_zombies_owned_by_the_given_parent() {
        let mut table = PCB_TABLE.lock();
        let parent_idx = table.insert("parent".to_string(), true).unwrap();
        let parent_pid = table.get(parent_idx).unwrap().pid;
        let child_idx = table.insert("child".to_string(), true).unwrap();
        {
            let child = table.get_mut(child_idx).unwrap();
            child.parent = Some(parent_pid);
            child.state = PcbState::Zombie;
        }
        drop(table);

        let reaped = reap(Some(parent_pid));
        assert_eq!(reaped, 1);
        assert!(PCB_TABLE.lock().get(child_idx).is_none());
        PCB_TABLE.lock().remove(parent_idx);
    }
}
