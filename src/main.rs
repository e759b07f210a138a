//! Boot entry point.
//!
//! The boot path initializes sync, memory, the PCB table, filesystem, and
//! network, then starts an idle thread and the shell thread (spec §2).
//! Scheduling after that point is driven by timer ticks and voluntary
//! yields; this function never returns.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

#[cfg(not(test))]
extern crate alloc;

#[cfg(not(test))]
use ferrite_kernel::{arch, block::MemBlockDevice, fs::Filesystem, info, net, process, shell};

/// A 512-block in-memory disk, standing in for a real IDE/AHCI device
/// until a disk driver exists (spec §1 non-goal: driver programming is out
/// of scope for this crate).
#[cfg(not(test))]
const ROOT_DISK_BLOCKS: u32 = 2048;

#[cfg(not(test))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    unsafe {
        ferrite_kernel::init_heap();
    }

    ferrite_kernel::init_subsystems();

    let dev = MemBlockDevice::new(ROOT_DISK_BLOCKS);
    let mut fs = Filesystem::format(dev, 256, ROOT_DISK_BLOCKS).expect("format root filesystem");
    let root = Filesystem::<MemBlockDevice>::root_inode();

    let idle_index = process::create_kthread("idle", idle_entry as usize as u32).expect("create idle thread");
    process::scheduler::enqueue_ready(idle_index);
    let idle_pid = process::table::PCB_TABLE.lock().get(idle_index).unwrap().pid;
    debug_assert_eq!(idle_pid, 1);

    // The shell is a user process, not a kernel thread (spec §8 scenario 1:
    // `create_process("/bin/shell", 0, [], 0)` assigns it pid 2), even
    // though it has no ELF loader behind it yet — its "image" is empty.
    let shell_index = process::create_process("/bin/shell", &[], alloc::vec::Vec::new()).expect("create shell process");
    process::scheduler::enqueue_ready(shell_index);
    let shell_pid = process::table::PCB_TABLE.lock().get(shell_index).unwrap().pid;
    debug_assert_eq!(shell_pid, 2);

    info!("boot: pcb table, filesystem, and network ready; entering scheduler");

    let mut ctx = shell::ShellContext { fs: &mut fs, cwd: root, pid: shell_pid };
    loop {
        if let Some(index) = process::scheduler::dispatch() {
            if index == idle_index {
                idle_entry();
            } else if index == shell_index {
                run_shell_once(&mut ctx);
            }
        }
        process::cleanup::reap(None);
        process::scheduler::yield_now();
    }
}

/// The idle kernel thread: run only when nothing else is ready.
#[cfg(not(test))]
fn idle_entry() {
    arch::cpu_idle();
}

/// The shell process's body for one scheduler turn: drain any queued
/// outbound network traffic, then read and dispatch one command line.
#[cfg(not(test))]
fn run_shell_once<D: ferrite_kernel::block::BlockDevice>(ctx: &mut shell::ShellContext<D>) {
    net::engine::drain_tx(|_raw| Ok(()));
    // A real build reads the next line from the console driver; without
    // one, the shell thread simply idles until interactive input exists.
    let _ = ctx;
}
