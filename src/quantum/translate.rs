//! Offset translation
//!
//! Maps an absolute byte offset onto the quantum chain.

use crate::device::Geometry;

/// Coordinates of a byte inside the quantum chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index of the quantum set in the chain
    pub set_index: usize,

    /// Slot of the quantum inside its set
    pub slot_index: usize,

    /// Byte offset inside the quantum
    pub block_offset: usize,
}

/// Translate an absolute offset for the given geometry
///
/// Total for any validated [`Geometry`]; set indexes beyond `usize` saturate,
/// which only matters for offsets no chain could ever reach.
pub fn translate(offset: u64, geometry: Geometry) -> Position {
    let quantum = geometry.quantum() as u64;
    let item_size = geometry.item_size();

    let set_index = offset / item_size;
    let rest = offset % item_size;

    Position {
        set_index: usize::try_from(set_index).unwrap_or(usize::MAX),
        slot_index: (rest / quantum) as usize,
        block_offset: (rest % quantum) as usize,
    }
}
