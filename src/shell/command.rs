//! Command parsing

use std::io::SeekFrom;

use crate::device::AccessMode;
use crate::error::{Result, ScullError};

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a device by minor number
    Open { minor: u32, mode: AccessMode },

    /// Release a file descriptor
    Close { fd: u32 },

    /// One read call of up to `len` bytes
    Read { fd: u32, len: usize },

    /// Write all of `data`, looping across quanta
    Write { fd: u32, data: Vec<u8> },

    /// Move a file position
    Seek { fd: u32, target: SeekFrom },

    /// Logical size of a device
    Size { minor: u32 },

    /// Discard a device's content
    Trim { minor: u32 },

    /// Size and memory use of one device, or all of them
    Stat { minor: Option<u32> },

    Help,

    Quit,
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self> {
        let (name, rest) = split_word(line.trim());

        let command = match name.to_ascii_lowercase().as_str() {
            "open" => {
                let (minor, rest) = split_word(rest);
                let (mode, rest) = split_word(rest);
                no_more(rest)?;
                Command::Open {
                    minor: number("minor", minor)?,
                    mode: access_mode(mode)?,
                }
            }
            "close" => {
                let (fd, rest) = split_word(rest);
                no_more(rest)?;
                Command::Close {
                    fd: number("fd", fd)?,
                }
            }
            "read" => {
                let (fd, rest) = split_word(rest);
                let (len, rest) = split_word(rest);
                no_more(rest)?;
                Command::Read {
                    fd: number("fd", fd)?,
                    len: number("length", len)?,
                }
            }
            "write" => {
                let (fd, text) = split_word(rest);
                Command::Write {
                    fd: number("fd", fd)?,
                    data: text.as_bytes().to_vec(),
                }
            }
            "seek" => {
                let (fd, rest) = split_word(rest);
                let (whence, rest) = split_word(rest);
                let (offset, rest) = split_word(rest);
                no_more(rest)?;
                let target = match whence {
                    "set" => SeekFrom::Start(number("offset", offset)?),
                    "cur" => SeekFrom::Current(number("offset", offset)?),
                    "end" => SeekFrom::End(number("offset", offset)?),
                    other => {
                        return Err(ScullError::Command(format!(
                            "unknown seek origin {:?} (expected set, cur or end)",
                            other
                        )))
                    }
                };
                Command::Seek {
                    fd: number("fd", fd)?,
                    target,
                }
            }
            "size" => Command::Size {
                minor: single_number("minor", rest)?,
            },
            "trim" => Command::Trim {
                minor: single_number("minor", rest)?,
            },
            "stat" => {
                let (minor, rest) = split_word(rest);
                no_more(rest)?;
                Command::Stat {
                    minor: if minor.is_empty() {
                        None
                    } else {
                        Some(number("minor", minor)?)
                    },
                }
            }
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(ScullError::Command("empty command".to_string())),
            other => return Err(ScullError::Command(format!("unknown command {:?}", other))),
        };

        Ok(command)
    }
}

/// Split off the first whitespace-delimited word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], input[end..].trim_start()),
        None => (input, ""),
    }
}

fn no_more(rest: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(ScullError::Command(format!("unexpected argument {:?}", rest)))
    }
}

fn number<T: std::str::FromStr>(what: &str, word: &str) -> Result<T> {
    if word.is_empty() {
        return Err(ScullError::Command(format!("missing {}", what)));
    }
    word.parse()
        .map_err(|_| ScullError::Command(format!("invalid {} {:?}", what, word)))
}

fn single_number<T: std::str::FromStr>(what: &str, rest: &str) -> Result<T> {
    let (word, rest) = split_word(rest);
    no_more(rest)?;
    number(what, word)
}

fn access_mode(word: &str) -> Result<AccessMode> {
    match word {
        "ro" | "r" => Ok(AccessMode::ReadOnly),
        "wo" | "w" => Ok(AccessMode::WriteOnly),
        "rw" => Ok(AccessMode::ReadWrite),
        "" => Err(ScullError::Command("missing access mode".to_string())),
        other => Err(ScullError::Command(format!(
            "unknown access mode {:?} (expected ro, wo or rw)",
            other
        ))),
    }
}
