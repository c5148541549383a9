use crate::parse::ast::Node;
use std::cell::Cell;
use std::fmt;
use std::mem;

pub const DEFAULT_CAPACITY: usize = 64 * 1024;

const ALIGN: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Arena allocator out of memory: requested {requested}, available {available}")]
    OutOfMemory { requested: usize, available: usize },
    #[error("AST handle from generation {found} used after reset (current generation {current})")]
    StaleHandle { found: u32, current: u32 },
    #[error("AST handle #{0} does not refer to an allocated node")]
    InvalidHandle(u32),
}

/// Handle to a node stored in an [Arena]. Only valid for the arena generation that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// Bump-style node pool with a fixed byte budget.
///
/// Every allocation is charged its size rounded up to 8 bytes. Nothing is freed individually;
/// [Arena::reset] reclaims everything at once and invalidates every outstanding [NodeId].
#[derive(Debug)]
pub struct Arena {
    nodes: Vec<Node>,
    capacity: usize,
    used: Cell<usize>,
    generation: u32,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            capacity,
            used: Cell::new(0),
            generation: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used.get()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used.get()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Charges `bytes` against the budget without storing anything.
    pub fn carve(&self, bytes: usize) -> Result<(), ArenaError> {
        let requested = align_up(bytes);
        let available = self.remaining();
        if requested > available {
            tracing::warn!(requested, available, "arena exhausted");
            return Err(ArenaError::OutOfMemory {
                requested,
                available,
            });
        }
        self.used.set(self.used.get() + requested);
        Ok(())
    }

    pub fn alloc(&mut self, node: Node) -> Result<NodeId, ArenaError> {
        let index = u32::try_from(self.nodes.len()).map_err(|_| ArenaError::OutOfMemory {
            requested: mem::size_of::<Node>(),
            available: 0,
        })?;
        self.carve(mem::size_of::<Node>() + node.payload_bytes())?;
        self.nodes.push(node);
        Ok(NodeId {
            index,
            generation: self.generation,
        })
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, ArenaError> {
        if id.generation != self.generation {
            return Err(ArenaError::StaleHandle {
                found: id.generation,
                current: self.generation,
            });
        }
        self.nodes
            .get(id.index as usize)
            .ok_or(ArenaError::InvalidHandle(id.index))
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
        self.used.set(0);
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

const fn align_up(bytes: usize) -> usize {
    (bytes + ALIGN - 1) & !(ALIGN - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ast::Literal;

    fn literal(value: i64) -> Node {
        Node::from(Literal { value })
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(13), 16);
    }

    #[test]
    fn test_alloc_and_get() {
        let mut arena = Arena::with_capacity(4096);
        let a = arena.alloc(literal(1)).unwrap();
        let b = arena.alloc(literal(2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(arena.get(a).unwrap(), &literal(1));
        assert_eq!(arena.get(b).unwrap(), &literal(2));
        assert_eq!(arena.used() % ALIGN, 0);
        assert_eq!(arena.used(), 2 * align_up(mem::size_of::<Node>()));
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = Arena::with_capacity(mem::size_of::<Node>());
        arena.alloc(literal(1)).unwrap();
        let err = arena.alloc(literal(2)).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { .. }));
        assert_eq!(arena.len(), 1);

        assert_eq!(arena.remaining(), 0);
        assert!(arena.carve(1).is_err());
    }

    #[test]
    fn test_reset_invalidates_handles() {
        let mut arena = Arena::with_capacity(4096);
        let old = arena.alloc(literal(7)).unwrap();
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert!(arena.is_empty());
        assert_eq!(
            arena.get(old),
            Err(ArenaError::StaleHandle {
                found: 0,
                current: 1
            })
        );

        let new = arena.alloc(literal(8)).unwrap();
        assert_eq!(new.index(), old.index());
        assert_eq!(arena.get(new).unwrap(), &literal(8));
    }
}
