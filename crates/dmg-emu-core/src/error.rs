use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading a cartridge image.
#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("failed to read ROM {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ROM image is {len} bytes, too small to hold a header")]
    TooSmall { len: usize },
    #[error("header checksum mismatch: header says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
}

/// Conditions that end an emulation session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmulationError {
    #[error("invalid opcode {opcode:02X} at PC={pc:04X}")]
    InvalidOpcode { opcode: u8, pc: u16 },
    #[error("STOP executed at PC={pc:04X}")]
    Stopped { pc: u16 },
}
