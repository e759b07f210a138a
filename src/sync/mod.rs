//! Synchronization primitives used throughout the kernel.
//!
//! Three tools, each for a different hazard:
//! - [`Spinlock`] guards short critical sections shared between contexts
//!   that must never sleep while holding the lock.
//! - [`SleepMutex`] guards longer critical sections where the caller is
//!   allowed to block the current process instead of spinning.
//! - [`CriticalSection`] disables interrupts for the handful of operations
//!   (PCB table mutation, scheduler dispatch) that must run atomically with
//!   respect to the timer interrupt.

mod critical_section;
mod sleep_mutex;
mod spinlock;

pub use critical_section::CriticalSection;
pub use sleep_mutex::SleepMutex;
pub use spinlock::{any_held, Spinlock, SpinlockGuard};
