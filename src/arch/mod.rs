//! Architecture glue.
//!
//! GDT/IDT setup, the PIT tick source, and PCI/keyboard/disk driver
//! programming are explicitly out of scope for this crate (spec §1) — the
//! core subsystems only need the narrow interface below, which a real
//! freestanding build would back with actual port I/O and a real PIC/UART.
//! The implementation here is the minimal placeholder needed to make the
//! crate link and the subsystems above it testable in isolation.

use crate::process::pcb::CpuContext;

#[cfg(all(target_arch = "x86", not(test)))]
mod x86;

/// Write raw bytes to the kernel console (serial in a real build).
pub fn console_write(bytes: &[u8]) {
    #[cfg(all(target_arch = "x86", not(test)))]
    {
        x86::serial_write(bytes);
    }
    #[cfg(not(all(target_arch = "x86", not(test))))]
    {
        let _ = bytes;
    }
}

/// Halt the CPU forever (used by the panic handler).
pub fn halt_loop() -> ! {
    loop {
        cpu_idle();
    }
}

/// Idle for one scheduler turn: a single `hlt`, woken by the next timer
/// interrupt. Used by the idle kernel thread, which unlike `halt_loop`
/// must return so the scheduler can dispatch something else once a tick
/// or interrupt makes the ready queue non-empty again.
pub fn cpu_idle() {
    #[cfg(all(target_arch = "x86", not(test)))]
    x86::hlt();
}

/// Save/restore the integer register file for a context switch.
///
/// A real build implements this with inline assembly that stores to and
/// loads from the outgoing/incoming `CpuContext`, switches the kernel stack
/// pointer, and (for user processes) reloads `cr3`. Modeled here as a trait
/// so `process::scheduler` can be exercised without real hardware.
pub trait ContextSwitch {
    /// Save the currently executing register state into `out`.
    fn save(out: &mut CpuContext);
    /// Restore `input` and resume execution there. Never returns to the
    /// caller — control transfers to whatever `eip`/`esp` describe.
    fn restore(input: &CpuContext) -> !;
}
