use thiserror::Error;

use crate::memory::parse::ParseError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by memory access and instruction execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// Address outside of memory
    #[error("Bad address: {address}")]
    OutOfRange { address: usize },
    /// Value that does not fit into a memory cell
    #[error("Bad value: {value}")]
    InvalidValue { value: i64 },
    /// Opcode 9-15 fetched
    #[error("Illegal instruction code: {opcode}")]
    IllegalOpcode { opcode: u8 },
    #[error("SCRAM is halted")]
    AlreadyHalted,
    /// Step requested after an earlier fault
    #[error("SCRAM faulted: {0}")]
    Faulted(Box<Error>),
}

/// Failures while loading a hex memory image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Memory(#[from] Error),
}
