use std::{io, path::PathBuf};

use thiserror::Error;

use crate::decode::Mnemonic;

#[derive(Debug, Error)]
pub enum CpuError {
    #[error("invalid opcode {opcode:#04X} at {pc:#06X}")]
    InvalidOpcode { opcode: u8, pc: u16 },
    #[error("operands do not fit {mnemonic:?}")]
    OperandMismatch { mnemonic: Mnemonic },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("boot ROM is {len} bytes, at most 256 fit in the overlay")]
    BootRomTooLarge { len: usize },
    #[error("ROM image is empty")]
    EmptyRom,
    #[error("boot ROM image is empty")]
    EmptyBootRom,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SstError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
