//! Round-robin scheduler: dispatch, yield, sleep, block/wake, and exit.
//!
//! State transitions (spec §4.4):
//! `New -> Running` on first dispatch, `Running -> Stopped` (preempted,
//! requeued) or `Running -> Blocked`/`Sleeping` on `yield_now`/`sleep`,
//! `Blocked -> Stopped` on `wake`, `Running -> Zombie` on `exit` (reaped by
//! [`super::cleanup`]).

use crate::sync::any_held;

use super::current;
use super::pcb::PcbState;
use super::queue::PcbQueue;
use super::table::PCB_TABLE;

static READY_QUEUE: crate::sync::Spinlock<PcbQueue> = crate::sync::Spinlock::new(PcbQueue::new());
static BLOCKED_QUEUE: crate::sync::Spinlock<PcbQueue> = crate::sync::Spinlock::new(PcbQueue::new());

/// Add a freshly created process to the ready queue.
pub fn enqueue_ready(index: usize) {
    READY_QUEUE.lock().push(index);
}

/// Pick the next ready process and make it current. Returns its table
/// index, or `None` if the ready queue is empty (idle).
pub fn dispatch() -> Option<usize> {
    let index = READY_QUEUE.lock().pop()?;
    let mut table = PCB_TABLE.lock();
    let pcb = table.get_mut(index)?;
    pcb.state = PcbState::Running;
    let pid = pcb.pid;
    drop(table);
    current::set_current(pid);
    Some(index)
}

/// Voluntarily give up the CPU. Panics if a spinlock is held, since the
/// holder would never release it once this process is switched out.
pub fn yield_now() {
    assert!(
        !any_held(),
        "yield_now called while holding a spinlock"
    );
    if let Some(pid) = current::current_pid() {
        let mut table = PCB_TABLE.lock();
        if let Some(index) = table.find_by_pid(pid) {
            if let Some(pcb) = table.get_mut(index) {
                pcb.state = PcbState::Stopped;
                pcb.stats.yields += 1;
            }
            drop(table);
            READY_QUEUE.lock().push(index);
        }
    }
    current::clear_current();
}

/// Put the current process to sleep until `wake_tick`.
pub fn sleep(wake_tick: u32) {
    if let Some(pid) = current::current_pid() {
        let mut table = PCB_TABLE.lock();
        if let Some(index) = table.find_by_pid(pid) {
            if let Some(pcb) = table.get_mut(index) {
                pcb.state = PcbState::Sleeping;
                pcb.sleep_until = wake_tick;
            }
            drop(table);
            BLOCKED_QUEUE.lock().push(index);
        }
    }
    current::clear_current();
}

/// Move the current process onto the blocked queue (used by
/// [`crate::sync::SleepMutex`]).
pub fn block_current() {
    if let Some(pid) = current::current_pid() {
        let mut table = PCB_TABLE.lock();
        if let Some(index) = table.find_by_pid(pid) {
            if let Some(pcb) = table.get_mut(index) {
                pcb.state = PcbState::Blocked;
                pcb.stats.blocked_count += 1;
            }
            drop(table);
            BLOCKED_QUEUE.lock().push(index);
        }
    }
    current::clear_current();
}

/// Move `pid` from the blocked queue back onto the ready queue.
pub fn wake(pid: i16) {
    let mut table = PCB_TABLE.lock();
    if let Some(index) = table.find_by_pid(pid) {
        if BLOCKED_QUEUE.lock().remove(index) {
            if let Some(pcb) = table.get_mut(index) {
                pcb.state = PcbState::Stopped;
            }
            drop(table);
            READY_QUEUE.lock().push(index);
        }
    }
}

/// Advance sleeping processes by one tick, waking any whose deadline has
/// passed. Called from the timer interrupt in a real build.
pub fn tick(now: u32) {
    let mut table = PCB_TABLE.lock();
    let mut woken = alloc::vec::Vec::new();
    for pid in table
        .iter()
        .filter(|p| p.state == PcbState::Sleeping && p.sleep_until <= now)
        .map(|p| p.pid)
        .collect::<alloc::vec::Vec<_>>()
    {
        if let Some(index) = table.find_by_pid(pid) {
            if BLOCKED_QUEUE.lock().remove(index) {
                if let Some(pcb) = table.get_mut(index) {
                    pcb.state = PcbState::Stopped;
                }
                woken.push(index);
            }
        }
    }
    drop(table);
    let mut ready = READY_QUEUE.lock();
    for index in woken {
        ready.push(index);
    }
}

/// Mark the current process a zombie; its slot is reclaimed by
/// [`super::cleanup::reap`] once its parent collects it (or immediately, for
/// orphans).
pub fn exit(index: usize) {
    if let Some(pcb) = PCB_TABLE.lock().get_mut(index) {
        pcb.state = PcbState::Zombie;
    }
    current::clear_current();
}

pub fn ready_len() -> usize {
    READY_QUEUE.lock().len()
}

pub fn blocked_len() -> usize {
    BLOCKED_QUEUE.lock().len()
}
