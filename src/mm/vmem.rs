//! Per-process virtual address spaces.
//!
//! Each process owns a small number of [`Allocation`] records — one for its
//! data segment, one growable heap region, one stack region — tracked in a
//! `Vec` owned by the process rather than as an intrusive linked list (see
//! the queue design note in [`crate::process::queue`]). [`AddressSpace`]
//! does not itself touch `cr3` or real page tables: that belongs to
//! [`crate::arch`], which is out of scope here. It instead backs each
//! allocation with its own page-aligned buffer, addressed the same way a
//! real page table would (directory index, table index, page offset), so
//! the allocation and fault-path logic is exercised the same way it would
//! be against hardware.

use alloc::vec;
use alloc::vec::Vec;

use super::layout::{directory_index, table_index, PAGE_MASK, PAGE_SIZE, VMEM_DATA, VMEM_HEAP, VMEM_STACK};
use crate::lib::error::Errno;

/// One mapped region: a contiguous run of pages starting at `base`,
/// backed by `frames` (one `PAGE_SIZE` buffer per page, simulating the
/// physical frames a real allocator would hand out).
pub struct Allocation {
    pub base: u32,
    pub page_count: u32,
    frames: Vec<Vec<u8>>,
}

impl Allocation {
    fn new(base: u32, page_count: u32) -> Self {
        Self {
            base,
            page_count,
            frames: vec![vec![0u8; PAGE_SIZE as usize]; page_count as usize],
        }
    }

    fn end(&self) -> u32 {
        self.base + self.page_count * PAGE_SIZE
    }

    fn contains(&self, vaddr: u32) -> bool {
        vaddr >= self.base && vaddr < self.end()
    }

    fn offset_of(&self, vaddr: u32) -> (usize, usize) {
        let page = ((vaddr - self.base) / PAGE_SIZE) as usize;
        let within = (vaddr & PAGE_MASK) as usize;
        (page, within)
    }
}

/// A process's virtual address space: a data segment, a heap that grows
/// upward from [`VMEM_HEAP`], and a stack that grows downward from
/// [`VMEM_STACK`].
pub struct AddressSpace {
    allocations: Vec<Allocation>,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self {
            allocations: Vec::new(),
        }
    }

    /// Map the process's data segment at [`VMEM_DATA`], sized to hold
    /// `data.len()` bytes, and copy `data` into it.
    pub fn init_process(&mut self, data: &[u8]) -> Result<(), Errno> {
        let pages = pages_for(data.len());
        let mut alloc = Allocation::new(VMEM_DATA, pages);
        let mut written = 0;
        for frame in alloc.frames.iter_mut() {
            let take = core::cmp::min(frame.len(), data.len() - written);
            frame[..take].copy_from_slice(&data[written..written + take]);
            written += take;
        }
        self.allocations.push(alloc);
        Ok(())
    }

    /// Allocate `size` bytes of stack, returning the initial stack pointer
    /// (the top of the mapped region, since x86 stacks grow down).
    pub fn stack_alloc(&mut self, size: u32) -> Result<u32, Errno> {
        let pages = pages_for(size as usize);
        let base = VMEM_STACK - pages * PAGE_SIZE;
        self.allocations.push(Allocation::new(base, pages));
        Ok(VMEM_STACK)
    }

    /// Grow the heap by `size` bytes, returning the base of the new region
    /// (classic `brk`-style bump growth, never shrinks).
    pub fn heap_grow(&mut self, size: u32) -> Result<u32, Errno> {
        let current_top = self
            .allocations
            .iter()
            .filter(|a| a.base >= VMEM_HEAP && a.base < VMEM_STACK)
            .map(|a| a.end())
            .max()
            .unwrap_or(VMEM_HEAP);
        let pages = pages_for(size as usize);
        self.allocations.push(Allocation::new(current_top, pages));
        Ok(current_top)
    }

    /// Translate a virtual address to the backing byte slice it maps to.
    pub fn translate(&self, vaddr: u32, len: usize) -> Result<&[u8], Errno> {
        let alloc = self
            .allocations
            .iter()
            .find(|a| a.contains(vaddr))
            .ok_or(Errno::Efault)?;
        let (page, within) = alloc.offset_of(vaddr);
        let frame = &alloc.frames[page];
        if within + len > frame.len() {
            return Err(Errno::Efault);
        }
        Ok(&frame[within..within + len])
    }

    pub fn translate_mut(&mut self, vaddr: u32, len: usize) -> Result<&mut [u8], Errno> {
        let alloc = self
            .allocations
            .iter_mut()
            .find(|a| a.contains(vaddr))
            .ok_or(Errno::Efault)?;
        let (page, within) = alloc.offset_of(vaddr);
        let frame = &mut alloc.frames[page];
        if within + len > frame.len() {
            return Err(Errno::Efault);
        }
        Ok(&mut frame[within..within + len])
    }

    /// Release every allocation owned by this address space (process exit).
    pub fn cleanup(&mut self) {
        self.allocations.clear();
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

fn pages_for(size: usize) -> u32 {
    let size = size as u32;
    (size + PAGE_SIZE - 1) / PAGE_SIZE
}

/// Exposed for callers that want to reason about page-table-style
/// addressing directly (mirrors the original `TABLE_INDEX`/`DIRECTORY_INDEX`
/// macros).
pub fn page_table_indices(vaddr: u32) -> (u32, u32) {
    (directory_index(vaddr), table_index(vaddr))
}
