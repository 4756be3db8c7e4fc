use std::convert::TryFrom;
use std::fmt;

use crate::error::{Error, Result};
use crate::memory::{Address, Byte, ScramMem};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Where the processor is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum State {
    Running,
    /// HLT was executed
    Halted,
    /// A fetch or decode failed. Holds the failure
    Faulted(Error),
}

/// Emulates the SCRAM processor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Processor {
    /// Memory, program and data alike
    memory: ScramMem,
    /// Program counter. May step to 16 after executing the last cell
    pc: Address,
    /// Accumulator
    acc: Byte,
    state: State,
}

impl Default for Processor {
    /// Initializes a new CPU
    fn default() -> Self {
        Self::new()
    }
}

impl From<ScramMem> for Processor {
    /// Initializes a new CPU on top of preloaded memory
    fn from(memory: ScramMem) -> Self {
        Self {
            memory,
            ..Self::new()
        }
    }
}

impl Processor {
    /// Initializes a new CPU with zeroed memory and registers
    pub fn new() -> Self {
        Self {
            memory: ScramMem::default(),
            pc: 0,
            acc: 0,
            state: State::Running,
        }
    }

    /// Reads the memory cell at `address`
    pub fn read_memory(&self, address: Address) -> Result<Byte> {
        self.memory.read_byte(address)
    }

    /// Writes `value` to the memory cell at `address`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `address` is not in 0-15, [`Error::InvalidValue`]
    /// if `value` does not fit into a byte. Memory is unchanged on error.
    pub fn write_memory(&mut self, address: Address, value: i64) -> Result<()> {
        self.memory.write_value(address, value)
    }

    /// The whole memory, for dumps
    pub fn memory(&self) -> &ScramMem {
        &self.memory
    }

    /// Current accumulator value
    pub fn accumulator(&self) -> Byte {
        self.acc
    }

    /// Address of the next instruction to fetch
    pub fn program_counter(&self) -> Address {
        self.pc
    }

    /// Running, halted or faulted
    pub fn state(&self) -> &State {
        &self.state
    }

    /// True once HLT has been executed
    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// True until the processor halts or faults
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Executes a single, already decoded instruction
    pub fn execute_instruction(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::Hlt => {
                self.state = State::Halted;
            }
            Instruction::Lda(addr) => {
                self.acc = self.memory.read_byte(addr.into())?;
            }
            Instruction::Ldi(addr) => {
                let target = self.indirect(addr)?;
                self.acc = self.memory.read_byte(target)?;
            }
            Instruction::Sta(addr) => {
                self.memory.write_byte(addr.into(), self.acc)?;
            }
            Instruction::Sti(addr) => {
                let target = self.indirect(addr)?;
                self.memory.write_byte(target, self.acc)?;
            }
            Instruction::Add(addr) => {
                let value = self.memory.read_byte(addr.into())?;
                self.acc = self.acc.wrapping_add(value);
            }
            Instruction::Sub(addr) => {
                let value = self.memory.read_byte(addr.into())?;
                self.acc = self.acc.wrapping_sub(value);
            }
            Instruction::Jmp(addr) => {
                self.pc = addr.into();
            }
            Instruction::Jmz(addr) => {
                if self.acc == 0 {
                    self.pc = addr.into();
                }
            }
        }

        debug!("{} => A={:02x} PC={:x}", instruction, self.acc, self.pc);

        Ok(())
    }

    /// Runs one execution step: fetch, advance the PC, decode, execute.
    ///
    /// Any failure during a step leaves the processor [`State::Faulted`];
    /// later calls report that fault instead of executing again.
    pub fn step(&mut self) -> Result<()> {
        match &self.state {
            State::Running => {}
            State::Halted => return Err(Error::AlreadyHalted),
            State::Faulted(cause) => return Err(Error::Faulted(Box::new(cause.clone()))),
        }

        let result = self.fetch_and_execute();
        if let Err(err) = &result {
            warn!("fault at PC={:x}: {}", self.pc, err);
            self.state = State::Faulted(err.clone());
        }
        result
    }

    fn fetch_and_execute(&mut self) -> Result<()> {
        let byte = self.memory.read_byte(self.pc)?; // Read opcode where PC is
        self.pc += 1;
        let instruction = decode(byte)?;
        self.execute_instruction(instruction)
    }

    /// Resolves the pointer cell at `addr` to the address it holds
    fn indirect(&self, addr: u8) -> Result<Address> {
        Ok((self.memory.read_byte(addr.into())? & 0xF).into())
    }
}

impl fmt::Display for Processor {
    /// Snapshot in the trace format: memory, accumulator and program counter
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} A={:02x} PC={:x}", self.memory, self.acc, self.pc)
    }
}

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// The high nibble of an instruction byte
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }
        }

        impl ::std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

opcodes! {
    /// Stop the execution of the program
    HLT = 0x0,
    /// Load accumulator from an address
    LDA = 0x1,
    /// Load accumulator through a pointer cell
    LDI = 0x2,
    /// Store accumulator to an address
    STA = 0x3,
    /// Store accumulator through a pointer cell
    STI = 0x4,
    /// Add a memory cell to the accumulator
    ADD = 0x5,
    /// Subtract a memory cell from the accumulator
    SUB = 0x6,
    /// Jump to an address
    JMP = 0x7,
    /// Jump to an address if the accumulator is zero
    JMZ = 0x8,
}

/// A decoded instruction. Operands are 4 bit addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Hlt,
    Lda(u8),
    Ldi(u8),
    Sta(u8),
    Sti(u8),
    Add(u8),
    Sub(u8),
    Jmp(u8),
    Jmz(u8),
}

impl Instruction {
    /// Builds the instruction for `opcode`. Only the low nibble of `operand` is kept
    pub fn new(opcode: Opcode, operand: u8) -> Self {
        let data = operand & 0xF;
        match opcode {
            Opcode::HLT => Self::Hlt,
            Opcode::LDA => Self::Lda(data),
            Opcode::LDI => Self::Ldi(data),
            Opcode::STA => Self::Sta(data),
            Opcode::STI => Self::Sti(data),
            Opcode::ADD => Self::Add(data),
            Opcode::SUB => Self::Sub(data),
            Opcode::JMP => Self::Jmp(data),
            Opcode::JMZ => Self::Jmz(data),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Hlt => Opcode::HLT,
            Self::Lda(_) => Opcode::LDA,
            Self::Ldi(_) => Opcode::LDI,
            Self::Sta(_) => Opcode::STA,
            Self::Sti(_) => Opcode::STI,
            Self::Add(_) => Opcode::ADD,
            Self::Sub(_) => Opcode::SUB,
            Self::Jmp(_) => Opcode::JMP,
            Self::Jmz(_) => Opcode::JMZ,
        }
    }

    /// The operand nibble. HLT has none
    pub fn operand(&self) -> Option<u8> {
        match *self {
            Self::Hlt => None,
            Self::Lda(data)
            | Self::Ldi(data)
            | Self::Sta(data)
            | Self::Sti(data)
            | Self::Add(data)
            | Self::Sub(data)
            | Self::Jmp(data)
            | Self::Jmz(data) => Some(data),
        }
    }

    /// Packs the instruction back into its byte
    pub fn encode(&self) -> Byte {
        let opcode: u8 = self.opcode().into();
        opcode << 4 | (self.operand().unwrap_or(0) & 0xF)
    }
}

impl From<Instruction> for Byte {
    fn from(instruction: Instruction) -> Self {
        instruction.encode()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(data) => write!(f, "{} {}", self.opcode(), data),
            None => write!(f, "{}", self.opcode()),
        }
    }
}

/// Splits `byte` into opcode (high nibble) and operand (low nibble)
pub fn decode(byte: Byte) -> Result<Instruction> {
    let code = byte >> 4;
    let opcode = Opcode::try_from(code).map_err(|_| Error::IllegalOpcode { opcode: code })?;
    Ok(Instruction::new(opcode, byte & 0xF))
}
