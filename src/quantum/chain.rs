//! Quantum chain
//!
//! Singly-linked list of quantum sets. Each set owns its quanta and its
//! successor outright, so the whole structure is a tree rooted at the chain.

use std::alloc::{self, Layout};

use crate::error::{Result, ScullError};

/// A single quantum: a fixed-size, zero-initialised byte buffer
type Quantum = Box<[u8]>;

/// One link of the chain
///
/// The slot table is only allocated on the first write into the set, so a set
/// created purely to reach a later index costs a single small node.
#[derive(Debug, Default)]
pub struct QuantumSet {
    slots: Option<Box<[Option<Quantum>]>>,
    next: Option<Box<QuantumSet>>,
}

impl QuantumSet {
    fn new() -> Self {
        Self::default()
    }

    /// Get the quantum stored in `slot`, if it was ever written
    pub fn quantum(&self, slot: usize) -> Option<&[u8]> {
        self.slots.as_ref()?.get(slot)?.as_deref()
    }

    /// Get the quantum in `slot`, allocating the slot table and the quantum
    /// as needed
    ///
    /// Allocation is fallible: on failure nothing in this set changes.
    pub fn quantum_or_alloc(&mut self, slot: usize, qset: usize, quantum: usize) -> Result<&mut [u8]> {
        if self.slots.is_none() {
            let mut table: Vec<Option<Quantum>> = Vec::new();
            table.try_reserve_exact(qset).map_err(|_| ScullError::OutOfMemory {
                requested: qset * std::mem::size_of::<Option<Quantum>>(),
            })?;
            table.resize_with(qset, || None);
            self.slots = Some(table.into_boxed_slice());
        }

        let entry = self
            .slots
            .as_mut()
            .and_then(|slots| slots.get_mut(slot))
            .ok_or_else(|| ScullError::InvalidOffset(format!("slot {} outside qset {}", slot, qset)))?;

        let data = match entry {
            Some(data) => data,
            empty @ None => empty.insert(zeroed_quantum(quantum)?),
        };
        Ok(&mut data[..])
    }

    /// Number of quanta allocated in this set
    pub fn allocated_quanta(&self) -> usize {
        self.slots
            .as_ref()
            .map(|slots| slots.iter().filter(|q| q.is_some()).count())
            .unwrap_or(0)
    }
}

/// Memory usage of a chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Quantum sets in the chain
    pub sets: usize,

    /// Quanta allocated across all sets
    pub quanta: usize,
}

/// The ordered chain of quantum sets
#[derive(Debug, Default)]
pub struct BlockChain {
    head: Option<Box<QuantumSet>>,
    len: usize,
}

impl BlockChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sets in the chain
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Find the set at `index` without extending the chain
    pub fn locate(&self, index: usize) -> Option<&QuantumSet> {
        let mut node = self.head.as_deref()?;
        for _ in 0..index {
            node = node.next.as_deref()?;
        }
        Some(node)
    }

    /// Find the set at `index`, appending empty sets until it exists
    ///
    /// Each appended set is allocated fallibly. On `OutOfMemory` the sets
    /// appended so far stay linked and are counted in `len()`, so the caller
    /// can cut them off again with [`truncate`](Self::truncate).
    pub fn locate_or_extend(&mut self, index: usize) -> Result<&mut QuantumSet> {
        if index >= self.len {
            tracing::trace!("Extending quantum chain from {} to {} sets", self.len, index + 1);
        }

        let mut link = &mut self.head;
        let mut hops = 0;
        loop {
            let node = match link {
                Some(node) => node,
                empty @ None => {
                    let node = empty.insert(boxed_set()?);
                    self.len += 1;
                    node
                }
            };
            if hops == index {
                return Ok(&mut **node);
            }
            link = &mut node.next;
            hops += 1;
        }
    }

    /// Drop every set past the first `len`
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        let tail = if len == 0 {
            self.head.take()
        } else {
            let mut node = self.head.as_deref_mut();
            for _ in 1..len {
                node = node.and_then(|n| n.next.as_deref_mut());
            }
            node.and_then(|n| n.next.take())
        };

        release(tail);
        self.len = len;
    }

    /// Release every set and quantum
    pub fn clear(&mut self) {
        release(self.head.take());
        self.len = 0;
    }

    /// Count sets and allocated quanta
    pub fn stats(&self) -> ChainStats {
        let mut stats = ChainStats::default();
        let mut node = self.head.as_deref();
        while let Some(set) = node {
            stats.sets += 1;
            stats.quanta += set.allocated_quanta();
            node = set.next.as_deref();
        }
        stats
    }
}

impl Drop for BlockChain {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Allocate a zero-filled quantum, reporting failure instead of aborting
fn zeroed_quantum(quantum: usize) -> Result<Quantum> {
    let mut data: Vec<u8> = Vec::new();
    data.try_reserve_exact(quantum)
        .map_err(|_| ScullError::OutOfMemory { requested: quantum })?;
    data.resize(quantum, 0);
    Ok(data.into_boxed_slice())
}

/// Allocate an empty set on the heap, reporting failure instead of aborting
///
/// `Box::new` aborts the process when the allocator fails, and stable Rust has
/// no fallible `Box` constructor.
fn boxed_set() -> Result<Box<QuantumSet>> {
    let layout = Layout::new::<QuantumSet>();
    // SAFETY: QuantumSet holds two pointers, so the layout is not zero-sized.
    let ptr = unsafe { alloc::alloc(layout) }.cast::<QuantumSet>();
    if ptr.is_null() {
        return Err(ScullError::OutOfMemory {
            requested: layout.size(),
        });
    }
    // SAFETY: `ptr` is non-null and was allocated by the global allocator with
    // the layout of QuantumSet. It is initialised before the Box takes
    // ownership, and the Box frees it with that same layout.
    unsafe {
        ptr.write(QuantumSet::new());
        Ok(Box::from_raw(ptr))
    }
}

/// Free a detached run of sets one link at a time
///
/// The default recursive drop of `Box<QuantumSet>` would use one stack frame
/// per set.
fn release(mut link: Option<Box<QuantumSet>>) {
    while let Some(mut set) = link {
        link = set.next.take();
    }
}
