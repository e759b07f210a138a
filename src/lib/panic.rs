//! Panic handling.
//!
//! A logic-error panic (double free, releasing an unheld mutex, cleanup of
//! the running PCB, ...) is fatal per spec §7: print a diagnostic dump of the
//! offending PCB and halt.

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::error!("KERNEL PANIC: {}", info);
    if let Some(pcb) = crate::process::current::try_current() {
        crate::error!("{}", pcb.dbg_dump());
    }
    crate::arch::halt_loop()
}
