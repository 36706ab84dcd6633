//! Shell session
//!
//! Holds the registry and the table of open file descriptors, executes parsed
//! commands and renders replies.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Write};

use super::Command;
use crate::device::DeviceStats;
use crate::error::{Result, ScullError};
use crate::registry::{DeviceNode, DeviceNumber, DeviceRegistry, OpenFile};

/// First descriptor handed out, after stdin/stdout/stderr
const FIRST_FD: u32 = 3;

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Opened { fd: u32, number: DeviceNumber },
    Closed,
    Data(Vec<u8>),
    Written(usize),
    Position(u64),
    Size(u64),
    Trimmed,
    Stats(Vec<StatLine>),
    Help,
    Quit,
}

/// One device's line in a `stat` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    pub name: String,
    pub number: DeviceNumber,
    pub open_count: usize,
    pub stats: DeviceStats,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Opened { fd, number } => write!(f, "fd {} ({})", fd, number),
            Reply::Closed => write!(f, "closed"),
            Reply::Data(data) => write!(
                f,
                "{} bytes: {:?}",
                data.len(),
                String::from_utf8_lossy(data)
            ),
            Reply::Written(count) => write!(f, "wrote {} bytes", count),
            Reply::Position(pos) => write!(f, "position {}", pos),
            Reply::Size(size) => write!(f, "size {}", size),
            Reply::Trimmed => write!(f, "trimmed"),
            Reply::Stats(lines) => {
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{} ({}): size={} {} sets={} quanta={} allocated={} open={}",
                        line.name,
                        line.number,
                        line.stats.size,
                        line.stats.geometry,
                        line.stats.sets,
                        line.stats.quanta,
                        line.stats.allocated_bytes,
                        line.open_count
                    )?;
                }
                Ok(())
            }
            Reply::Help => f.write_str(
                "commands: open <minor> <ro|wo|rw>, close <fd>, read <fd> <len>, \
                 write <fd> <text>, seek <fd> <set|cur|end> <offset>, size <minor>, \
                 trim <minor>, stat [minor], help, quit",
            ),
            Reply::Quit => write!(f, "bye"),
        }
    }
}

/// A shell session over one registry
pub struct Session {
    registry: DeviceRegistry,
    files: BTreeMap<u32, OpenFile>,
    next_fd: u32,
}

impl Session {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            registry,
            files: BTreeMap::new(),
            next_fd: FIRST_FD,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Descriptors currently open
    pub fn open_fds(&self) -> impl Iterator<Item = u32> + '_ {
        self.files.keys().copied()
    }

    /// Execute one command
    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Open { minor, mode } => {
                let file = self.registry.open(minor, mode)?;
                let number = file.number();
                let fd = self.next_fd;
                self.next_fd += 1;
                self.files.insert(fd, file);
                Ok(Reply::Opened { fd, number })
            }
            Command::Close { fd } => {
                let file = self.files.remove(&fd).ok_or_else(|| bad_fd(fd))?;
                file.release();
                Ok(Reply::Closed)
            }
            Command::Read { fd, len } => Ok(Reply::Data(self.file(fd)?.read_chunk(len)?)),
            Command::Write { fd, data } => {
                let file = self.file(fd)?;
                let mut written = 0;
                while written < data.len() {
                    written += file.write_chunk(&data[written..])?;
                }
                Ok(Reply::Written(written))
            }
            Command::Seek { fd, target } => Ok(Reply::Position(self.file(fd)?.llseek(target)?)),
            Command::Size { minor } => Ok(Reply::Size(self.registry.device(minor)?.size())),
            Command::Trim { minor } => {
                self.registry.device(minor)?.trim();
                Ok(Reply::Trimmed)
            }
            Command::Stat { minor } => {
                let lines = match minor {
                    Some(minor) => vec![stat_line(self.registry.node(minor)?)],
                    None => self.registry.iter().map(stat_line).collect(),
                };
                Ok(Reply::Stats(lines))
            }
            Command::Help => Ok(Reply::Help),
            Command::Quit => Ok(Reply::Quit),
        }
    }

    /// Parse and execute one line
    ///
    /// Returns `None` for blank lines and comments.
    pub fn execute_line(&mut self, line: &str) -> Option<Result<Reply>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some(Command::parse(line).and_then(|command| self.execute(command)))
    }

    /// Run commands from `input` until it ends or `quit` is read
    ///
    /// Command failures are reported on `output` and the session continues;
    /// only I/O errors on `input` or `output` end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, output: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            match self.execute_line(&line) {
                None => continue,
                Some(Ok(Reply::Quit)) => {
                    writeln!(output, "{}", Reply::Quit)?;
                    break;
                }
                Some(Ok(reply)) => writeln!(output, "{}", reply)?,
                Some(Err(e)) => {
                    tracing::warn!("Command {:?} failed: {}", line.trim(), e);
                    writeln!(output, "error: {}", e)?;
                }
            }
        }
        output.flush()?;
        Ok(())
    }

    fn file(&mut self, fd: u32) -> Result<&mut OpenFile> {
        self.files.get_mut(&fd).ok_or_else(|| bad_fd(fd))
    }
}

fn bad_fd(fd: u32) -> ScullError {
    ScullError::Command(format!("bad file descriptor {}", fd))
}

fn stat_line(node: &DeviceNode) -> StatLine {
    StatLine {
        name: node.name(),
        number: node.number(),
        open_count: node.open_count(),
        stats: node.device().stats(),
    }
}
