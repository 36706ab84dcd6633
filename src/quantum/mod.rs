//! Quantum Module
//!
//! The two-level sparse layout behind every scull device.
//!
//! ## Layout
//! ```text
//!  head
//!   │
//!   ▼
//! ┌──────────────┐  next  ┌──────────────┐  next
//! │ QuantumSet 0 │ ─────▶ │ QuantumSet 1 │ ─────▶ ...
//! └──────┬───────┘        └──────┬───────┘
//!        │ slots[0..qset]        │
//!        ▼                       ▼
//!   [q][ ][q][ ]...         [ ][ ][q][ ]...
//!    │     │                      │
//!    ▼     ▼                      ▼
//!  quantum bytes (allocated on first write)
//! ```
//!
//! ## Responsibilities
//! - Translate absolute offsets into (set, slot, offset-in-quantum)
//! - Walk the chain without allocating on reads
//! - Extend the chain and allocate quanta lazily on writes

mod chain;
mod translate;

pub use chain::{BlockChain, ChainStats, QuantumSet};
pub use translate::{translate, Position};
