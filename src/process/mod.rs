//! Process control: the PCB, the process table, run queues, and the
//! scheduler.

pub mod cleanup;
pub mod current;
pub mod pcb;
pub mod queue;
pub mod scheduler;
pub mod table;

pub use pcb::{CpuContext, Pcb, PcbState};
pub use table::PCB_TABLE;

use alloc::string::String;
use alloc::vec::Vec;

use crate::lib::error::Errno;

/// Create a new process from a loaded program image and argv, mirroring
/// `pcb_create_process`. The process starts `New` and is not yet on the
/// ready queue — the caller enqueues it once setup (data segment, stack)
/// completes.
pub fn create_process(name: &str, image: &[u8], argv: Vec<String>) -> Result<usize, Errno> {
    let index = PCB_TABLE.lock().insert(String::from(name), true)?;
    let mut table = PCB_TABLE.lock();
    let pcb = table.get_mut(index).ok_or(Errno::Enomem)?;
    pcb.address_space.init_process(image)?;
    pcb.data_size = image.len() as u32;
    let sp = pcb.address_space.stack_alloc(crate::mm::PAGE_SIZE)?;
    pcb.stackptr = sp;
    pcb.ctx.esp = sp;
    pcb.argv = argv;
    Ok(index)
}

/// Create a kernel thread: no address space of its own, runs in kernel
/// context at `entry`.
pub fn create_kthread(name: &str, entry: u32) -> Result<usize, Errno> {
    let index = PCB_TABLE.lock().insert(String::from(name), false)?;
    let mut table = PCB_TABLE.lock();
    let pcb = table.get_mut(index).ok_or(Errno::Enomem)?;
    pcb.ctx.eip = entry;
    Ok(index)
}
