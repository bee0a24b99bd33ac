//! Block arena for quadtree nodes.
//!
//! Nodes are stored in fixed-size blocks that are appended only when the
//! current block is full, so allocation never moves existing nodes and costs
//! O(1). Individual nodes are never freed: the whole tree is released with
//! [`BlockArena::clear`], which also invalidates every reference handed out
//! before it.

use std::ops::Index;

use thiserror::Error;

/// Slots per block.
pub const BLOCK_SIZE: usize = 1000;

/// Errors raised by [`BlockArena::allocate`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// The configured ceiling was reached. This is a sizing bug, not a runtime condition.
    #[error("node arena exhausted: capacity limit of {limit} nodes reached")]
    Exhausted { limit: usize },
}

/// Handle to a value stored in a [`BlockArena`].
///
/// Carries the arena generation it was issued in; after a `clear` the handle
/// is stale and no longer resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    index: u32,
    generation: u32,
}

impl NodeRef {
    /// Position of the value in allocation order.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Fixed-capacity block allocator with bulk lifetime.
#[derive(Debug)]
pub struct BlockArena<T> {
    blocks: Vec<Vec<T>>,
    len: usize,
    capacity_limit: usize,
    generation: u32,
}

impl<T> BlockArena<T> {
    /// Create an arena that refuses allocations beyond `capacity_limit` values.
    pub fn with_capacity_limit(capacity_limit: usize) -> Self {
        Self {
            blocks: Vec::new(),
            len: 0,
            capacity_limit,
            generation: 0,
        }
    }

    /// Store `value` and return a handle to it.
    pub fn allocate(&mut self, value: T) -> Result<NodeRef, ArenaError> {
        if self.len >= self.capacity_limit || self.len >= u32::MAX as usize {
            return Err(ArenaError::Exhausted {
                limit: self.capacity_limit,
            });
        }

        let needs_block = self
            .blocks
            .last()
            .is_none_or(|block| block.len() == BLOCK_SIZE);
        if needs_block {
            self.blocks.push(Vec::with_capacity(BLOCK_SIZE));
        }

        let index = self.len;
        // A block was appended above when the last one was full.
        if let Some(block) = self.blocks.last_mut() {
            block.push(value);
        }
        self.len += 1;

        Ok(NodeRef {
            index: index as u32,
            generation: self.generation,
        })
    }

    /// Resolve a handle. Returns `None` for handles issued before the last `clear`.
    pub fn get(&self, node: NodeRef) -> Option<&T> {
        if node.generation != self.generation {
            return None;
        }
        let index = node.index as usize;
        self.blocks
            .get(index / BLOCK_SIZE)
            .and_then(|block| block.get(index % BLOCK_SIZE))
    }

    /// Mutable access to a live value.
    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut T> {
        if node.generation != self.generation {
            return None;
        }
        let index = node.index as usize;
        self.blocks
            .get_mut(index / BLOCK_SIZE)
            .and_then(|block| block.get_mut(index % BLOCK_SIZE))
    }

    /// Drop every value and invalidate all outstanding handles.
    ///
    /// The first block's allocation is kept for the next build.
    pub fn clear(&mut self) {
        self.blocks.truncate(1);
        if let Some(block) = self.blocks.first_mut() {
            block.clear();
        }
        self.len = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks currently allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Maximum number of values this arena accepts.
    pub fn capacity_limit(&self) -> usize {
        self.capacity_limit
    }

    /// Change the ceiling. Values already stored are unaffected.
    pub fn set_capacity_limit(&mut self, capacity_limit: usize) {
        self.capacity_limit = capacity_limit;
    }

    /// Iterate over live values in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.blocks.iter().flatten()
    }
}

impl<T> Index<NodeRef> for BlockArena<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `node` was issued before the last `clear`.
    fn index(&self, node: NodeRef) -> &T {
        self.get(node).expect("stale node reference")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_resolve() {
        let mut arena = BlockArena::with_capacity_limit(10);
        let a = arena.allocate("a").unwrap();
        let b = arena.allocate("b").unwrap();
        assert_eq!(arena[a], "a");
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn test_new_block_only_when_full() {
        let mut arena = BlockArena::with_capacity_limit(3 * BLOCK_SIZE);
        for i in 0..BLOCK_SIZE {
            arena.allocate(i).unwrap();
        }
        assert_eq!(arena.block_count(), 1);
        let next = arena.allocate(BLOCK_SIZE).unwrap();
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena[next], BLOCK_SIZE);
    }

    #[test]
    fn test_values_do_not_move_when_blocks_grow() {
        let mut arena = BlockArena::with_capacity_limit(4 * BLOCK_SIZE);
        let first = arena.allocate(0usize).unwrap();
        let addr = arena.get(first).unwrap() as *const usize;
        for i in 1..(2 * BLOCK_SIZE + 5) {
            arena.allocate(i).unwrap();
        }
        assert_eq!(arena.get(first).unwrap() as *const usize, addr);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut arena = BlockArena::with_capacity_limit(2);
        arena.allocate(1).unwrap();
        arena.allocate(2).unwrap();
        assert_eq!(
            arena.allocate(3),
            Err(ArenaError::Exhausted { limit: 2 })
        );
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_clear_invalidates_references() {
        let mut arena = BlockArena::with_capacity_limit(10);
        let old = arena.allocate(7).unwrap();
        arena.clear();
        assert!(arena.is_empty());
        assert!(arena.get(old).is_none());

        let new = arena.allocate(8).unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new, old);
        assert_eq!(arena[new], 8);
    }

    #[test]
    fn test_clear_keeps_first_block() {
        let mut arena = BlockArena::with_capacity_limit(3 * BLOCK_SIZE);
        for i in 0..(2 * BLOCK_SIZE) {
            arena.allocate(i).unwrap();
        }
        assert_eq!(arena.block_count(), 2);
        arena.clear();
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    #[should_panic(expected = "stale node reference")]
    fn test_indexing_stale_reference_panics() {
        let mut arena = BlockArena::with_capacity_limit(10);
        let old = arena.allocate(1).unwrap();
        arena.clear();
        let _value = arena[old];
    }

    #[test]
    fn test_get_mut_and_iter() {
        let mut arena = BlockArena::with_capacity_limit(10);
        let a = arena.allocate(1).unwrap();
        arena.allocate(2).unwrap();
        *arena.get_mut(a).unwrap() = 10;
        assert_eq!(arena.iter().copied().collect::<Vec<_>>(), vec![10, 2]);
    }
}
