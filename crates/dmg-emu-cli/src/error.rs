use std::io;
use std::path::PathBuf;

use dmg_emu_core::error::{CartridgeError, EmulationError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Emulation(#[from] EmulationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write screenshot {path}: {source}")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
    #[error("failed to create trace file {path}: {source}")]
    Trace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown button {0:?} (expected up, down, left, right, a, b, select or start)")]
    UnknownButton(String),
}
