//! Shell Module
//!
//! A line-oriented front end that plays the part of user space: it opens
//! devices, reads, writes and seeks through file descriptors, and reports
//! device sizes and memory use.
//!
//! ## Commands
//! ```text
//! open <minor> <ro|wo|rw>          open a device, prints the new fd
//! close <fd>                       release a handle
//! read <fd> <len>                  one read call at the fd position
//! write <fd> <text>                store text at the fd position (loops)
//! seek <fd> <set|cur|end> <off>    move the fd position
//! size <minor>                     logical size of a device
//! trim <minor>                     discard a device's content
//! stat [minor]                     size and memory use
//! help                             list commands
//! quit                             end the session
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

mod command;
mod session;

pub use command::Command;
pub use session::{Reply, Session, StatLine};
