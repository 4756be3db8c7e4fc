//! Assembly source for the SCRAM.
//!
//! ```text
//! # a = a + b
//! 0x0:
//!     LDA 0x4
//!     ADD 0x5
//!     STA 0x4
//!     HLT
//!     ! 0x07
//!     ! 0x08
//! ```

use std::borrow::Cow;
use std::error;
use std::{fmt, str::Lines};

use crate::processor::{Instruction, Opcode};

use super::{Address, Byte, Memory};

macro_rules! propagate {
    ( $res:expr ) => {
        match $res {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidAddress { address: usize },
    InvalidLiteral,
    InvalidNumber { radix: u32 },
    InvalidInstruction,
    InvalidOperand,
    InvalidAddressLabel,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidAddress { address } => {
                write!(f, "memory has no address `0x{:x}`", address)
            }
            ParseErrorKind::InvalidLiteral => f.write_str("invalid literal"),
            ParseErrorKind::InvalidNumber { radix } => {
                write!(f, "failed to parse number with radix `{}`", radix)
            }
            ParseErrorKind::InvalidInstruction => f.write_str("failed to resolve instruction"),
            ParseErrorKind::InvalidOperand => f.write_str("invalid operand"),
            ParseErrorKind::InvalidAddressLabel => f.write_str("invalid address label"),
        }
    }
}

/// Where in the input an error was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based line of an assembly source
    Line(usize),
    /// 0-based token of a hex image
    Token(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(nr) => write!(f, "ln: {}", nr),
            Location::Token(nr) => write!(f, "tok: {}", nr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    location: Location,
}

impl ParseError {
    pub(crate) fn new(
        kind: ParseErrorKind,
        context: Option<Cow<'static, str>>,
        location: Location,
    ) -> Self {
        Self {
            kind,
            context,
            location,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "error [{}]: {} - {}", self.location, self.kind, context)
        } else {
            write!(f, "error [{}]: {}", self.location, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

macro_rules! parse_number {
    ( $ty:ty: $s:expr ) => {{
        let line = $s;

        if line.trim().is_empty() {
            None
        } else {
            let (radix, offset) = match line.as_bytes() {
                [b'0', b'b', ..] => (2, 2),
                [b'0', b'o', ..] => (8, 2),
                [b'0', b'x', ..] => (16, 2),
                _ => (10, 0),
            };

            Some(<$ty>::from_str_radix(&line[offset..], radix).map_err(|_| radix))
        }
    }};
}

#[derive(Debug, Clone)]
pub struct Parser<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    cursor: Address,
    memory: Memory<S>,
}

impl<'a, const S: usize> Parser<'a, S> {
    /// Creates a new parser for `data` which will try to populate `memory`.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            cursor: 0,
            memory,
        }
    }

    /// Consumes `self` and tries to parse the whole source into memory.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Memory<S>, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(self.memory)
        } else {
            Err(errors)
        }
    }

    /// Tries to parse the next source line. Each instruction
    /// should be located on it's own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        if line.is_empty() || line.starts_with('#') {
            // Comment or empty line; skip
            Some(Ok(()))
        } else if line.starts_with('!') {
            // Line is a literal
            self.parse_literal(line)
        } else if line.ends_with(':') {
            // Line is a address label.
            self.parse_address_label(line)
        } else {
            // Line is an instruction.
            self.parse_instruction(line)
        }
    }

    /// Tries to parse line as literal byte.
    ///
    /// # Examples
    ///
    /// - `! 0x22`
    /// - `!0b101`
    fn parse_literal(&mut self, line: &str) -> Option<Result<()>> {
        let line = line.strip_prefix('!').unwrap_or(line).trim();

        log::debug!("[{}] Found byte literal", self.line_nr);

        let byte = propagate!(
            propagate!(parse_number!(u8: line).ok_or_else(|| self.error(
                ParseErrorKind::InvalidLiteral,
                "a literal needs to have a number set",
            )))
            .map_err(|radix| {
                self.error(
                    ParseErrorKind::InvalidLiteral,
                    format!("failed to parse literal as byte with radix `{}`", radix),
                )
            })
        );

        Some(self.write_byte(byte))
    }

    /// Tries to parse line as an address label.
    ///
    /// # Examples
    ///
    /// - `0xa:`
    /// - `0o14:`
    fn parse_address_label(&mut self, line: &str) -> Option<Result<()>> {
        let line = line.strip_suffix(':').unwrap_or(line).trim();

        log::debug!("[{}] Found address label", self.line_nr);

        let address = propagate!(
            propagate!(parse_number!(usize: line).ok_or_else(|| self.error(
                ParseErrorKind::InvalidAddressLabel,
                "an address label needs to have an address set",
            )))
            .map_err(|radix| {
                self.error(
                    ParseErrorKind::InvalidNumber { radix },
                    "failed to parse the address",
                )
            })
        );

        if address >= S {
            return Some(Err(self.error(
                ParseErrorKind::InvalidAddress { address },
                "address label is outside of memory",
            )));
        }

        log::debug!("[{}] Address label `0x{:x}`", self.line_nr, address);

        self.cursor = address;

        Some(Ok(()))
    }

    /// Tries to parse line as an instruction with its operand.
    ///
    /// # Examples
    ///
    /// - `LDA 0xe`
    /// - `HLT`
    fn parse_instruction(&mut self, line: &str) -> Option<Result<()>> {
        let mut parts = line.split_whitespace();
        let mnemonic = parts.next()?;

        let opcode = *propagate!(Opcode::ALL
            .iter()
            .find(|opcode| mnemonic.eq_ignore_ascii_case(opcode.name()))
            .ok_or_else(|| self.error(
                ParseErrorKind::InvalidInstruction,
                format!("no instruction named `{}`", mnemonic),
            )));

        let operand = match (opcode, parts.next()) {
            (Opcode::HLT, None) => 0,
            (Opcode::HLT, Some(extra)) => {
                return Some(Err(self.error(
                    ParseErrorKind::InvalidOperand,
                    format!("HLT takes no operand, found `{}`", extra),
                )))
            }
            (_, None) => {
                return Some(Err(self.error(
                    ParseErrorKind::InvalidOperand,
                    format!("{} needs an address operand", opcode),
                )))
            }
            (_, Some(operand)) => propagate!(self.parse_operand(operand)),
        };

        if let Some(extra) = parts.next() {
            return Some(Err(self.error(
                ParseErrorKind::InvalidOperand,
                format!("unexpected `{}` after operand", extra),
            )));
        }

        let instruction = Instruction::new(opcode, operand);
        log::debug!("[{}] Found instruction {}", self.line_nr, instruction);

        Some(self.write_byte(instruction))
    }

    /// Parses a 4 bit address operand
    fn parse_operand(&self, operand: &str) -> Result<u8> {
        let value = parse_number!(u8: operand)
            .unwrap_or(Err(10))
            .map_err(|radix| {
                self.error(
                    ParseErrorKind::InvalidNumber { radix },
                    format!("failed to parse operand `{}`", operand),
                )
            })?;

        if value > 0xF {
            return Err(self.error(
                ParseErrorKind::InvalidOperand,
                format!("operand `{}` does not fit into 4 bits", operand),
            ));
        }

        Ok(value)
    }

    /// Writes `byte` into memory at [`Parser::cursor`], then advances the
    /// cursor by one.
    ///
    /// # Errors
    ///
    /// This will return an error if the cursor already points past the end
    /// of memory.
    fn write_byte<B: Into<Byte>>(&mut self, byte: B) -> Result<()> {
        if self.memory.write_byte(self.cursor, byte.into()).is_err() {
            return Err(self.error(
                ParseErrorKind::InvalidAddress {
                    address: self.cursor,
                },
                "address is outside of memory",
            ));
        }
        self.cursor += 1;
        Ok(())
    }

    fn error<C: Into<Cow<'static, str>>>(&self, kind: ParseErrorKind, context: C) -> ParseError {
        ParseError::new(kind, Some(context.into()), Location::Line(self.line_nr))
    }
}
