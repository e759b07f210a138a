//! RAII interrupt mask for the handful of operations that must run
//! atomically with respect to the timer interrupt (PCB table mutation,
//! scheduler dispatch). Fails closed: if the guard is leaked or panics
//! without being dropped, interrupts stay disabled rather than silently
//! re-enabling over a half-finished critical section.

use core::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

#[must_use = "interrupts are re-enabled when this guard drops"]
pub struct CriticalSection {
    restore: bool,
}

impl CriticalSection {
    /// Disable interrupts, remembering whether they were already disabled so
    /// nested critical sections compose correctly.
    pub fn enter() -> Self {
        let restore = INTERRUPTS_ENABLED.swap(false, Ordering::AcqRel);
        Self { restore }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if self.restore {
            INTERRUPTS_ENABLED.store(true, Ordering::Release);
        }
    }
}

pub fn interrupts_enabled() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sections_restore_only_at_outermost_drop() {
        assert!(interrupts_enabled());
        let outer = CriticalSection::enter();
        assert!(!interrupts_enabled());
        {
            let inner = CriticalSection::enter();
            assert!(!interrupts_enabled());
            drop(inner);
        }
        assert!(!interrupts_enabled());
        drop(outer);
        assert!(interrupts_enabled());
    }
}
