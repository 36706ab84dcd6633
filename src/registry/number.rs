//! Device numbers
//!
//! Packs a major and minor number into one `u32` the way `MKDEV` does.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::{MAJOR_MAX, MINOR_BITS};

const MINOR_MASK: u32 = (1 << MINOR_BITS) - 1;

/// Highest major handed out by dynamic allocation; later requests count down
const DYNAMIC_MAJOR_START: u32 = 254;

/// Lowest major dynamic allocation will use before wrapping
const DYNAMIC_MAJOR_END: u32 = 234;

static NEXT_DYNAMIC_MAJOR: AtomicU32 = AtomicU32::new(DYNAMIC_MAJOR_START);

/// A (major, minor) device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceNumber {
    major: u32,
    minor: u32,
}

impl DeviceNumber {
    /// Build from parts. Values wider than their field are masked.
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major: major & MAJOR_MAX,
            minor: minor & MINOR_MASK,
        }
    }

    /// Unpack a `MKDEV`-style encoded number
    pub fn from_raw(raw: u32) -> Self {
        Self {
            major: raw >> MINOR_BITS,
            minor: raw & MINOR_MASK,
        }
    }

    /// `MKDEV`-style encoding: major in the high 12 bits, minor in the low 20
    pub fn raw(&self) -> u32 {
        (self.major << MINOR_BITS) | self.minor
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Pick a major number for a registry that asked for dynamic allocation
///
/// Counts down through the dynamic range and wraps around when it is used up.
pub(crate) fn allocate_dynamic_major() -> u32 {
    let result = NEXT_DYNAMIC_MAJOR.fetch_update(Ordering::AcqRel, Ordering::Acquire, |major| {
        Some(if major <= DYNAMIC_MAJOR_END {
            DYNAMIC_MAJOR_START
        } else {
            major - 1
        })
    });
    match result {
        Ok(major) | Err(major) => major,
    }
}
