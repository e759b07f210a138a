//! A mutex that blocks the calling process instead of spinning when
//! contended, for critical sections long enough that busy-waiting would
//! waste a scheduling quantum (inode cache lookups, socket receive queues).

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};
use heapless::Vec as HVec;

use crate::sync::Spinlock;

const MAX_WAITERS: usize = 32;

pub struct SleepMutex<T> {
    locked: AtomicBool,
    waiters: Spinlock<HVec<i16, MAX_WAITERS>>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SleepMutex<T> {}

impl<T> SleepMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            waiters: Spinlock::new(HVec::new()),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the mutex, blocking the calling process if it is held.
    ///
    /// Blocking here means moving the current PCB onto this mutex's wait
    /// list and yielding to the scheduler; the mutex records the waiting
    /// pid rather than the process itself so it never needs to know about
    /// `Pcb`'s internals.
    pub fn lock(&self) -> SleepMutexGuard<'_, T> {
        loop {
            if self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SleepMutexGuard { mutex: self };
            }
            if let Some(pid) = crate::process::current::current_pid() {
                let _ = self.waiters.lock().push(pid);
                crate::process::scheduler::block_current();
            } else {
                core::hint::spin_loop();
            }
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        if let Some(pid) = self.waiters.lock().pop() {
            crate::process::scheduler::wake(pid);
        }
    }
}

pub struct SleepMutexGuard<'a, T> {
    mutex: &'a SleepMutex<T>,
}

impl<'a, T> Deref for SleepMutexGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for SleepMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for SleepMutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_lock_round_trips_value() {
        let m: SleepMutex<u32> = SleepMutex::new(7);
        {
            let mut g = m.lock();
            *g += 1;
        }
        assert_eq!(*m.lock(), 8);
    }
}
