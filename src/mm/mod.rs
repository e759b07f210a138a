//! Memory management.
//!
//! Three allocators, each over a disjoint region of physical memory:
//! - [`palloc`]: a bump allocator over the low "permanent" window, used for
//!   structures that live for the life of the kernel (the PCB table, the
//!   inode cache).
//! - [`kalloc`]/[`kfree`]: a bitmap allocator over the kernel heap, for
//!   everything allocated and freed during normal operation.
//! - [`vmem`]: per-process virtual address spaces built from page-sized
//!   allocations tracked per region (data/heap/stack).

pub mod kalloc;
pub mod layout;
pub mod palloc;
pub mod vmem;

pub use kalloc::{kalloc, kfree, kmemory_total, kmemory_used};
pub use layout::*;
pub use palloc::{palloc, pmemory_used};
pub use vmem::{AddressSpace, Allocation};
