use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::ProcessControlBlock;
use crate::Pid;

/// A half-open range `[start, start + size)` of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryBlock {
    pub start: usize,
    pub size: usize,
}

impl MemoryBlock {
    pub fn new(start: usize, size: usize) -> MemoryBlock {
        MemoryBlock { start, size }
    }

    pub fn end(&self) -> usize {
        self.start + self.size
    }

    pub fn contains(&self, address: usize) -> bool {
        self.start <= address && address < self.end()
    }
}

/// Best-fit allocator over one linear address space.
///
/// Allocated and free blocks always tile `[0, total)` exactly.
#[derive(Debug)]
pub struct MemoryManager {
    total: usize,
    // start -> size
    free_blocks: BTreeMap<usize, usize>,
    allocated: BTreeMap<Pid, MemoryBlock>,
}

impl MemoryManager {
    pub fn new(total: usize) -> MemoryManager {
        let mut free_blocks = BTreeMap::new();
        if total > 0 {
            free_blocks.insert(0, total);
        }

        MemoryManager {
            total,
            free_blocks,
            allocated: BTreeMap::new(),
        }
    }

    pub fn get_total(&self) -> usize {
        self.total
    }

    pub fn get_free_memory(&self) -> usize {
        self.free_blocks.values().sum()
    }

    pub fn allocation_for(&self, pid: Pid) -> Option<MemoryBlock> {
        self.allocated.get(&pid).copied()
    }

    /// Grants `size` units to `pcb` from the smallest free block that fits.
    /// Ties go to the lowest address. Returns `None` when no block is large
    /// enough, or when the pid already holds memory.
    pub fn allocate(&mut self, pcb: &mut ProcessControlBlock, size: usize) -> Option<MemoryBlock> {
        let pid = pcb.get_pid();
        if self.allocated.contains_key(&pid) {
            debug!(pid, "allocation refused, pid already holds memory");
            return None;
        }

        let mut best_fit: Option<(usize, usize)> = None;
        for (&start, &block_size) in &self.free_blocks {
            if block_size < size {
                continue;
            }
            if best_fit.map_or(true, |(_, best_size)| block_size < best_size) {
                best_fit = Some((start, block_size));
            }
        }

        let Some((start, block_size)) = best_fit else {
            debug!(pid, size, free = self.get_free_memory(), "allocation failed");
            return None;
        };

        self.free_blocks.remove(&start);
        if block_size > size {
            self.free_blocks.insert(start + size, block_size - size);
        }

        let block = MemoryBlock::new(start, size);
        self.allocated.insert(pid, block);
        pcb.allocate_memory(start);

        debug!(pid, start, size, "memory allocated");
        Some(block)
    }

    /// Releases whatever `pcb` holds and merges adjacent free blocks.
    /// Freeing a pcb that holds nothing is a no-op.
    pub fn free(&mut self, pcb: &mut ProcessControlBlock) -> Option<MemoryBlock> {
        let pid = pcb.get_pid();
        let block = self.allocated.remove(&pid)?;

        pcb.free_memory();
        *self.free_blocks.entry(block.start).or_insert(0) += block.size;
        self.coalesce();

        debug!(pid, start = block.start, size = block.size, "memory freed");
        Some(block)
    }

    fn coalesce(&mut self) {
        let mut merged: BTreeMap<usize, usize> = BTreeMap::new();
        let mut current: Option<(usize, usize)> = None;

        for (&start, &size) in &self.free_blocks {
            if size == 0 {
                continue;
            }
            current = match current {
                Some((run_start, run_size)) if run_start + run_size == start => {
                    Some((run_start, run_size + size))
                }
                Some((run_start, run_size)) => {
                    merged.insert(run_start, run_size);
                    Some((start, size))
                }
                None => Some((start, size)),
            };
        }

        if let Some((run_start, run_size)) = current {
            merged.insert(run_start, run_size);
        }

        self.free_blocks = merged;
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let mut allocated: Vec<(Pid, MemoryBlock)> =
            self.allocated.iter().map(|(&pid, &block)| (pid, block)).collect();
        allocated.sort_by_key(|(_, block)| (block.start, block.size));

        MemorySnapshot {
            total: self.total,
            allocated,
            free: self
                .free_blocks
                .iter()
                .map(|(&start, &size)| MemoryBlock::new(start, size))
                .collect(),
        }
    }
}

/// Point-in-time view of the address space, both lists in address order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total: usize,
    pub allocated: Vec<(Pid, MemoryBlock)>,
    pub free: Vec<MemoryBlock>,
}

impl MemorySnapshot {
    /// Checks that allocated and free blocks cover `[0, total)` with no gap
    /// and no overlap.
    pub fn is_tiled(&self) -> bool {
        let mut blocks: Vec<MemoryBlock> = self
            .allocated
            .iter()
            .map(|(_, block)| *block)
            .chain(self.free.iter().copied())
            .collect();
        blocks.sort_by_key(|block| (block.start, block.size));

        let mut cursor = 0;
        for block in blocks {
            if block.start != cursor {
                return false;
            }
            cursor = block.end();
        }
        cursor == self.total
    }

    pub fn free_total(&self) -> usize {
        self.free.iter().map(|block| block.size).sum()
    }

    pub fn largest_free(&self) -> Option<MemoryBlock> {
        self.free.iter().copied().max_by_key(|block| block.size)
    }

    /// The pid owning `address`, if it is allocated.
    pub fn owner_at(&self, address: usize) -> Option<Pid> {
        self.allocated
            .iter()
            .find(|(_, block)| block.contains(address))
            .map(|(pid, _)| *pid)
    }
}
