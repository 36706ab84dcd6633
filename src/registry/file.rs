//! Open file handles
//!
//! An [`OpenFile`] is what a process holds after opening a device: the access
//! mode, a file position, and the signal that can interrupt its lock waits.

use std::io::{self, SeekFrom};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{DeviceNode, DeviceNumber};
use crate::device::{AccessMode, ScullDevice};
use crate::error::{Result, ScullError};
use crate::signal::Signal;

/// An open handle on a registered device
///
/// Dropping the handle releases it.
#[derive(Debug)]
pub struct OpenFile {
    node: Arc<DeviceNode>,
    mode: AccessMode,
    pos: u64,
    signal: Signal,
}

impl OpenFile {
    pub(super) fn new(node: Arc<DeviceNode>, mode: AccessMode, signal: Signal) -> Self {
        Self {
            node,
            mode,
            pos: 0,
            signal,
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Current file position
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn number(&self) -> DeviceNumber {
        self.node.number
    }

    pub fn device(&self) -> &ScullDevice {
        &self.node.device
    }

    /// Signal that interrupts this handle's lock waits
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Read up to `len` bytes at the file position and advance it
    ///
    /// Never crosses a quantum boundary; an empty result means a hole or the
    /// end of the data.
    pub fn read_chunk(&mut self, len: usize) -> Result<Vec<u8>> {
        if !self.mode.can_read() {
            return Err(ScullError::WrongAccessMode {
                mode: self.mode,
                operation: "reading",
            });
        }
        let data = self.node.device.read_with(self.pos, len, Some(&self.signal))?;
        self.pos += data.len() as u64;
        Ok(data)
    }

    /// Write up to one quantum of `data` at the file position and advance it
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<usize> {
        if !self.mode.can_write() {
            return Err(ScullError::WrongAccessMode {
                mode: self.mode,
                operation: "writing",
            });
        }
        let written = self.node.device.write_with(self.pos, data, Some(&self.signal))?;
        self.pos += written as u64;
        Ok(written)
    }

    /// Move the file position
    ///
    /// `End` is relative to the logical size. Positions past the end are
    /// allowed; negative ones are not.
    pub fn llseek(&mut self, target: SeekFrom) -> Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(offset) => (offset, 0),
            SeekFrom::Current(delta) => (self.pos, delta),
            SeekFrom::End(delta) => (self.node.device.size(), delta),
        };

        let pos = base.checked_add_signed(delta).ok_or_else(|| {
            ScullError::InvalidOffset(format!("cannot seek {} from {}", delta, base))
        })?;

        self.pos = pos;
        Ok(pos)
    }

    /// Release the handle
    pub fn release(self) {}
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        self.node.open_count.fetch_sub(1, Ordering::AcqRel);
        self.node.device.release();
        tracing::debug!("Released {} ({})", self.node.name(), self.node.number);
    }
}

impl io::Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_chunk(buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for OpenFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_chunk(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for OpenFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.llseek(pos)?)
    }
}
