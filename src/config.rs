//! Configuration for scull
//!
//! Centralized configuration with sensible defaults. Mirrors the load-time
//! parameters of the classic driver, but every value is handed explicitly to
//! the devices created from it instead of living in process-wide state.

use crate::device::Geometry;
use crate::error::{Result, ScullError};

/// Default quantum (data block) size in bytes
pub const DEFAULT_QUANTUM: usize = 4000;

/// Default number of quanta per quantum set
pub const DEFAULT_QSET: usize = 1000;

/// Default number of device instances
pub const DEFAULT_NR_DEVS: u32 = 4;

/// Minor numbers are 20 bits wide
pub const MINOR_BITS: u32 = 20;

/// Major numbers are 12 bits wide
pub const MAJOR_MAX: u32 = (1 << (32 - MINOR_BITS)) - 1;

/// Main configuration for a set of scull devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Size of each quantum in bytes
    pub quantum: usize,

    /// Number of quanta referenced by each quantum set
    pub qset: usize,

    // -------------------------------------------------------------------------
    // Registration Configuration
    // -------------------------------------------------------------------------
    /// Number of independent devices to provision
    pub nr_devs: u32,

    /// Major number; 0 requests dynamic allocation
    pub major: u32,

    /// First minor number
    pub minor: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            qset: DEFAULT_QSET,
            nr_devs: DEFAULT_NR_DEVS,
            major: 0,
            minor: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from `name=value` module parameters
    ///
    /// Recognized names: `scull_quantum`, `scull_qset`, `scull_nr_devs`,
    /// `scull_major`, `scull_minor`. Anything else is rejected.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut builder = Self::builder();
        for param in params {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                ScullError::InvalidConfiguration(format!("expected name=value, got {:?}", param))
            })?;
            builder = builder.param(name.trim(), value.trim())?;
        }
        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Storage geometry handed to every device as its default
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.quantum, self.qset)
    }

    /// Check every field is usable
    pub fn validate(&self) -> Result<()> {
        self.geometry()?;

        if self.major > MAJOR_MAX {
            return Err(ScullError::InvalidConfiguration(format!(
                "major {} exceeds {}",
                self.major, MAJOR_MAX
            )));
        }

        let minor_limit = 1u64 << MINOR_BITS;
        if u64::from(self.minor) + u64::from(self.nr_devs) > minor_limit {
            return Err(ScullError::InvalidConfiguration(format!(
                "minors {}..{} do not fit in {} bits",
                self.minor,
                u64::from(self.minor) + u64::from(self.nr_devs),
                MINOR_BITS
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the quantum size (in bytes)
    pub fn quantum(mut self, quantum: usize) -> Self {
        self.config.quantum = quantum;
        self
    }

    /// Set the number of quanta per set
    pub fn qset(mut self, qset: usize) -> Self {
        self.config.qset = qset;
        self
    }

    /// Set the number of devices
    pub fn nr_devs(mut self, count: u32) -> Self {
        self.config.nr_devs = count;
        self
    }

    /// Set the major number (0 = dynamic)
    pub fn major(mut self, major: u32) -> Self {
        self.config.major = major;
        self
    }

    /// Set the first minor number
    pub fn minor(mut self, minor: u32) -> Self {
        self.config.minor = minor;
        self
    }

    /// Apply a single named module parameter
    pub fn param(self, name: &str, value: &str) -> Result<Self> {
        fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| {
                ScullError::InvalidConfiguration(format!("{}: invalid value {:?}", name, value))
            })
        }

        Ok(match name {
            "scull_quantum" => self.quantum(parse(name, value)?),
            "scull_qset" => self.qset(parse(name, value)?),
            "scull_nr_devs" => self.nr_devs(parse(name, value)?),
            "scull_major" => self.major(parse(name, value)?),
            "scull_minor" => self.minor(parse(name, value)?),
            _ => {
                return Err(ScullError::InvalidConfiguration(format!(
                    "unknown parameter {:?}",
                    name
                )))
            }
        })
    }

    pub fn build(self) -> Config {
        self.config
    }
}
