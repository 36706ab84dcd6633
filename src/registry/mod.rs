//! Registry Module
//!
//! The host side of the devices: numbering, open handles and routing.
//!
//! ## Responsibilities
//! - Provision `nr_devs` independent devices from one [`Config`]
//! - Assign each a device number (static or dynamic major)
//! - Hand out [`OpenFile`] handles and count how many are open per device

mod file;
mod number;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::device::{AccessMode, ScullDevice};
use crate::error::{Result, ScullError};
use crate::signal::Signal;

pub use file::OpenFile;
pub use number::DeviceNumber;

/// One registered device and its handle bookkeeping
#[derive(Debug)]
pub struct DeviceNode {
    number: DeviceNumber,
    device: ScullDevice,
    open_count: AtomicUsize,
}

impl DeviceNode {
    pub fn number(&self) -> DeviceNumber {
        self.number
    }

    pub fn device(&self) -> &ScullDevice {
        &self.device
    }

    /// Handles currently open on this device
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Acquire)
    }

    /// Device name as it would appear under /dev
    pub fn name(&self) -> String {
        format!("scull{}", self.number.minor())
    }
}

/// The set of devices created from one configuration
#[derive(Debug)]
pub struct DeviceRegistry {
    config: Config,
    major: u32,
    nodes: Vec<Arc<DeviceNode>>,
}

impl DeviceRegistry {
    /// Validate `config` and create its devices
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;

        let major = if config.major == 0 {
            number::allocate_dynamic_major()
        } else {
            config.major
        };

        let nodes = (0..config.nr_devs)
            .map(|i| {
                Arc::new(DeviceNode {
                    number: DeviceNumber::new(major, config.minor + i),
                    device: ScullDevice::new(geometry),
                    open_count: AtomicUsize::new(0),
                })
            })
            .collect();

        tracing::info!(
            "Registered {} scull devices at major {} ({})",
            config.nr_devs,
            major,
            geometry
        );

        Ok(Self {
            config,
            major,
            nodes,
        })
    }

    /// Major number in use (allocated if the config asked for 0)
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Configuration the devices were created from
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered devices in minor order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceNode> {
        self.nodes.iter().map(|node| node.as_ref())
    }

    /// Look up a device node by minor number
    pub fn node(&self, minor: u32) -> Result<&DeviceNode> {
        self.node_arc(minor).map(|node| node.as_ref())
    }

    /// Look up a device by minor number
    pub fn device(&self, minor: u32) -> Result<&ScullDevice> {
        self.node(minor).map(DeviceNode::device)
    }

    /// Open a device without an interrupt source
    pub fn open(&self, minor: u32, mode: AccessMode) -> Result<OpenFile> {
        self.open_with_signal(minor, mode, Signal::new())
    }

    /// Open a device; `signal` interrupts this handle's lock waits
    pub fn open_with_signal(&self, minor: u32, mode: AccessMode, signal: Signal) -> Result<OpenFile> {
        let node = Arc::clone(self.node_arc(minor)?);
        node.device.open(mode, Some(&signal))?;
        node.open_count.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("Opened {} ({}) {}", node.name(), node.number, mode);
        Ok(OpenFile::new(node, mode, signal))
    }

    fn node_arc(&self, minor: u32) -> Result<&Arc<DeviceNode>> {
        minor
            .checked_sub(self.config.minor)
            .and_then(|index| self.nodes.get(index as usize))
            .ok_or(ScullError::NoSuchDevice(minor))
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        tracing::info!("Unregistered scull devices at major {}", self.major);
    }
}
