//! # scull
//!
//! A sparse, growable in-memory byte store in the shape of the classic scull
//! character device:
//! - Quantum sets chained into a singly-linked list
//! - Quanta (data blocks) allocated lazily on first write
//! - Holes read back as empty, never as fabricated zeros
//! - One exclusion lock per device, interruptible while waiting
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Shell / Caller                           │
//! │              (open, read, write, seek, close)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DeviceRegistry                              │
//! │        (device numbers, open handles, open counts)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one per minor
//!                       ▼
//!               ┌───────────────┐
//!               │  ScullDevice  │  Mutex { geometry, size, chain }
//!               └───────┬───────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │  BlockChain   │  QuantumSet → QuantumSet → ...
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod signal;
pub mod quantum;
pub mod device;
pub mod registry;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, ScullError};
pub use config::Config;
pub use device::{AccessMode, DeviceGuard, DeviceStats, Geometry, ScullDevice};
pub use registry::{DeviceNumber, DeviceRegistry, OpenFile};
pub use signal::Signal;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of scull
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
