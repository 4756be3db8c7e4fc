use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub mod parse;

pub type Byte = u8; // 1 byte
pub type Address = usize;

/// Number of cells the SCRAM can address with a 4 bit operand
pub const SCRAM_SIZE: usize = 16;

/// SCRAM memory
pub type ScramMem = Memory<SCRAM_SIZE>;

/// Emulates memory for use with the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Address) -> Result<Byte> {
        self.data
            .get(position)
            .copied()
            .ok_or(Error::OutOfRange { address: position })
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Address, value: Byte) -> Result<()> {
        let cell = self
            .data
            .get_mut(position)
            .ok_or(Error::OutOfRange { address: position })?;
        *cell = value;
        Ok(())
    }

    /// Writes a value that still has to be narrowed to a byte
    pub fn write_value(&mut self, position: Address, value: i64) -> Result<()> {
        if position >= S {
            return Err(Error::OutOfRange { address: position });
        }
        let byte = Byte::try_from(value).map_err(|_| Error::InvalidValue { value })?;
        self.write_byte(position, byte)
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, position: Address, data: &[Byte]) -> Result<()> {
        let end = position
            .checked_add(data.len())
            .filter(|&end| end <= S)
            .ok_or(Error::OutOfRange { address: position })?;
        self.data[position..end].copy_from_slice(data);
        Ok(())
    }
}

impl<const S: usize> fmt::Display for Memory<S> {
    /// Two digit hex cells separated by spaces
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl<const S: usize> FromStr for Memory<S> {
    type Err = Vec<parse::ParseError>;

    /// Assembles `source` into a fresh memory
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse::Parser::new(source, Memory::default()).parse()
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $crate::memory::Byte::from($byte),
            )+
        ])
    };
}
