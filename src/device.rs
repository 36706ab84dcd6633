//! Device Module
//!
//! A single scull device: a quantum chain, its logical size, and the one lock
//! that guards both.
//!
//! ## Responsibilities
//! - Serialize every read, write, trim and geometry change through one lock
//! - Translate offsets and walk (read) or extend (write) the quantum chain
//! - Track the logical size
//! - Truncate on write-only open

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{Result, ScullError};
use crate::quantum::{translate, BlockChain};
use crate::signal::Signal;

/// How often an interruptible waiter re-checks its signal
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

// =============================================================================
// Geometry
// =============================================================================

/// Quantum size and quanta-per-set of a device
///
/// Both values are positive by construction, so offset translation never
/// divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    quantum: usize,
    qset: usize,
}

impl Geometry {
    /// Validate and build a geometry
    pub fn new(quantum: usize, qset: usize) -> Result<Self> {
        if quantum == 0 {
            return Err(ScullError::InvalidConfiguration(
                "quantum size must be positive".to_string(),
            ));
        }
        if qset == 0 {
            return Err(ScullError::InvalidConfiguration(
                "quantum set size must be positive".to_string(),
            ));
        }
        (quantum as u64).checked_mul(qset as u64).ok_or_else(|| {
            ScullError::InvalidConfiguration(format!("{} x {} overflows the set size", quantum, qset))
        })?;

        Ok(Self { quantum, qset })
    }

    /// Bytes per quantum
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Quanta per set
    pub fn qset(&self) -> usize {
        self.qset
    }

    /// Bytes addressed by one full quantum set
    pub fn item_size(&self) -> u64 {
        self.quantum as u64 * self.qset as u64
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantum={} qset={}", self.quantum, self.qset)
    }
}

// =============================================================================
// Access Mode
// =============================================================================

/// Access mode requested at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::WriteOnly => "write-only",
            AccessMode::ReadWrite => "read-write",
        })
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Snapshot of a device's size and memory use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    /// Logical size in bytes
    pub size: u64,

    /// Geometry currently in effect
    pub geometry: Geometry,

    /// Quantum sets in the chain
    pub sets: usize,

    /// Quanta allocated
    pub quanta: usize,

    /// Bytes held by allocated quanta
    pub allocated_bytes: u64,
}

// =============================================================================
// Locked State
// =============================================================================

/// Everything the device lock protects
#[derive(Debug)]
struct DeviceState {
    geometry: Geometry,
    size: u64,
    chain: BlockChain,
}

impl DeviceState {
    fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            size: 0,
            chain: BlockChain::new(),
        }
    }

    /// Copy out at most one quantum's worth of bytes starting at `offset`
    ///
    /// Holes and offsets at or past the logical size yield no bytes.
    fn read(&self, offset: u64, len: usize) -> Vec<u8> {
        let available = self.size.saturating_sub(offset);
        let count = len.min(usize::try_from(available).unwrap_or(usize::MAX));
        if count == 0 {
            return Vec::new();
        }

        let pos = translate(offset, self.geometry);
        let quantum = match self
            .chain
            .locate(pos.set_index)
            .and_then(|set| set.quantum(pos.slot_index))
        {
            Some(quantum) => quantum,
            None => return Vec::new(),
        };

        let count = count.min(quantum.len() - pos.block_offset);
        quantum[pos.block_offset..pos.block_offset + count].to_vec()
    }

    /// Copy in at most one quantum's worth of bytes at `offset`
    ///
    /// On allocation failure the chain is cut back to its previous length and
    /// the size is untouched.
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        offset.checked_add(data.len() as u64).ok_or_else(|| {
            ScullError::InvalidOffset(format!("{} + {} overflows", offset, data.len()))
        })?;

        let geometry = self.geometry;
        let pos = translate(offset, geometry);
        let prev_len = self.chain.len();

        let written = self
            .chain
            .locate_or_extend(pos.set_index)
            .and_then(|set| set.quantum_or_alloc(pos.slot_index, geometry.qset(), geometry.quantum()))
            .map(|quantum| {
                let count = data.len().min(quantum.len() - pos.block_offset);
                quantum[pos.block_offset..pos.block_offset + count].copy_from_slice(&data[..count]);
                count
            });

        let count = match written {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Write at offset {} aborted: {}", offset, e);
                self.chain.truncate(prev_len);
                return Err(e);
            }
        };

        self.size = self.size.max(offset + count as u64);
        Ok(count)
    }

    fn trim(&mut self, defaults: Geometry) {
        self.chain.clear();
        self.size = 0;
        self.geometry = defaults;
    }
}

// =============================================================================
// Device Guard
// =============================================================================

/// Exclusive access to a device, held until dropped
///
/// Lets callers compose operations that must run under the device lock, such
/// as truncating from an open path that already holds it.
pub struct DeviceGuard<'a> {
    state: MutexGuard<'a, DeviceState>,
    defaults: Geometry,
}

impl DeviceGuard<'_> {
    /// Logical size in bytes
    pub fn size(&self) -> u64 {
        self.state.size
    }

    /// Geometry currently in effect
    pub fn geometry(&self) -> Geometry {
        self.state.geometry
    }

    /// Release every quantum and set, reset the size to 0 and restore the
    /// default geometry
    pub fn trim(&mut self) {
        let stats = self.state.chain.stats();
        tracing::debug!(
            "Trimming device: size={} sets={} quanta={}",
            self.state.size,
            stats.sets,
            stats.quanta
        );
        self.state.trim(self.defaults);
    }
}

// =============================================================================
// Device
// =============================================================================

/// A sparse in-memory byte store
///
/// ## Concurrency Model: one lock, fully serialized
///
/// Reads, writes, trims and geometry changes all take the same mutex, so each
/// operation sees the device as of its own acquisition point and never a
/// partially applied write. Distinct devices share nothing.
///
/// Every read and write touches at most one quantum. Callers wanting more
/// loop, advancing their own offset.
pub struct ScullDevice {
    /// Geometry restored by trim
    defaults: Geometry,

    /// Chain, size and current geometry
    state: Mutex<DeviceState>,
}

impl ScullDevice {
    /// Create an empty device with the given default geometry
    pub fn new(geometry: Geometry) -> Self {
        Self {
            defaults: geometry,
            state: Mutex::new(DeviceState::new(geometry)),
        }
    }

    /// Create an empty device, validating the raw geometry
    pub fn create(quantum: usize, qset: usize) -> Result<Self> {
        Ok(Self::new(Geometry::new(quantum, qset)?))
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Block until the device lock is held
    pub fn lock(&self) -> DeviceGuard<'_> {
        DeviceGuard {
            state: self.state.lock(),
            defaults: self.defaults,
        }
    }

    /// Block until the device lock is held or `signal` is raised
    ///
    /// An uncontended lock is taken even when the signal is already raised.
    pub fn lock_interruptible(&self, signal: &Signal) -> Result<DeviceGuard<'_>> {
        loop {
            if let Some(state) = self.state.try_lock_for(LOCK_POLL_INTERVAL) {
                return Ok(DeviceGuard {
                    state,
                    defaults: self.defaults,
                });
            }
            if signal.is_raised() {
                tracing::debug!("Lock wait interrupted");
                return Err(ScullError::Interrupted);
            }
        }
    }

    fn acquire(&self, signal: Option<&Signal>) -> Result<DeviceGuard<'_>> {
        match signal {
            Some(signal) => self.lock_interruptible(signal),
            None => Ok(self.lock()),
        }
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Run the open path for `mode`
    ///
    /// A write-only open discards all content, like truncate-on-open.
    pub fn open(&self, mode: AccessMode, signal: Option<&Signal>) -> Result<()> {
        if mode == AccessMode::WriteOnly {
            let mut guard = self.acquire(signal)?;
            guard.trim();
        }
        Ok(())
    }

    /// Release an open handle. Nothing to do at the device level.
    pub fn release(&self) {
        tracing::trace!("Releasing device");
    }

    /// Read up to `len` bytes at `offset`
    ///
    /// Returns fewer bytes than asked for at a quantum boundary, at the end of
    /// the data, or none at all inside a hole.
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.read_with(offset, len, None)
    }

    /// [`read`](Self::read) with an optional interruptible lock wait
    pub fn read_with(&self, offset: u64, len: usize, signal: Option<&Signal>) -> Result<Vec<u8>> {
        let guard = self.acquire(signal)?;
        let data = guard.state.read(offset, len);
        tracing::trace!("Read {} of {} bytes at offset {}", data.len(), len, offset);
        Ok(data)
    }

    /// Write up to one quantum of `data` at `offset`
    ///
    /// Returns the number of bytes stored, which may be less than `data.len()`.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<usize> {
        self.write_with(offset, data, None)
    }

    /// [`write`](Self::write) with an optional interruptible lock wait
    pub fn write_with(&self, offset: u64, data: &[u8], signal: Option<&Signal>) -> Result<usize> {
        let mut guard = self.acquire(signal)?;
        let written = guard.state.write(offset, data)?;
        tracing::trace!(
            "Wrote {} of {} bytes at offset {}, size now {}",
            written,
            data.len(),
            offset,
            guard.state.size
        );
        Ok(written)
    }

    // =========================================================================
    // Buffer Copies
    // =========================================================================

    /// Copy up to `len` bytes starting at `offset` into `sink`
    ///
    /// Loops across quanta and stops early at a hole or the end of the data.
    /// Each chunk is copied out under the lock and handed to `sink` after the
    /// lock is released; a failing sink is reported as
    /// [`ScullError::BufferFault`].
    pub fn read_to<W: Write>(
        &self,
        offset: u64,
        len: usize,
        sink: &mut W,
        signal: Option<&Signal>,
    ) -> Result<usize> {
        let mut copied = 0;
        while copied < len {
            let chunk = self.read_with(offset + copied as u64, len - copied, signal)?;
            if chunk.is_empty() {
                break;
            }
            sink.write_all(&chunk).map_err(ScullError::BufferFault)?;
            copied += chunk.len();
        }
        Ok(copied)
    }

    /// Copy exactly `len` bytes from `source` into the device at `offset`
    ///
    /// The source is drained into a staging buffer before the device is
    /// touched, so a failing or short source is reported as
    /// [`ScullError::BufferFault`] with nothing written. The staged bytes are
    /// then stored one quantum at a time.
    pub fn write_from<R: Read>(
        &self,
        offset: u64,
        len: usize,
        source: &mut R,
        signal: Option<&Signal>,
    ) -> Result<usize> {
        let mut staged = Vec::new();
        staged
            .try_reserve_exact(len)
            .map_err(|_| ScullError::OutOfMemory { requested: len })?;
        source
            .take(len as u64)
            .read_to_end(&mut staged)
            .map_err(ScullError::BufferFault)?;
        if staged.len() < len {
            return Err(ScullError::BufferFault(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("source supplied {} of {} bytes", staged.len(), len),
            )));
        }

        let mut written = 0;
        while written < len {
            written += self.write_with(offset + written as u64, &staged[written..], signal)?;
        }
        Ok(written)
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Current logical size in bytes
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Lock the device and discard everything in it
    pub fn trim(&self) {
        self.lock().trim();
    }

    /// Geometry currently in effect
    pub fn geometry(&self) -> Geometry {
        self.state.lock().geometry
    }

    /// Geometry restored by trim
    pub fn default_geometry(&self) -> Geometry {
        self.defaults
    }

    /// Override this device's geometry until the next trim
    ///
    /// Only allowed while the device holds no data, since the existing chain
    /// was laid out with the old geometry.
    pub fn set_geometry(&self, geometry: Geometry, signal: Option<&Signal>) -> Result<()> {
        let mut guard = self.acquire(signal)?;
        if !guard.state.chain.is_empty() || guard.state.size != 0 {
            return Err(ScullError::GeometryInUse);
        }
        tracing::debug!("Geometry changed from {} to {}", guard.state.geometry, geometry);
        guard.state.geometry = geometry;
        Ok(())
    }

    /// Size and memory snapshot
    pub fn stats(&self) -> DeviceStats {
        let state = self.state.lock();
        let chain = state.chain.stats();
        DeviceStats {
            size: state.size,
            geometry: state.geometry,
            sets: chain.sets,
            quanta: chain.quanta,
            allocated_bytes: chain.quanta as u64 * state.geometry.quantum() as u64,
        }
    }
}

impl fmt::Debug for ScullDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScullDevice")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
