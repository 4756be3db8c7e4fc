//! SCRAM, a tiny accumulator machine with sixteen bytes of memory.
//!
//! The [`Processor`] owns its memory and registers and advances one
//! instruction per [`Processor::step`]. [`loader::load_image`] fills memory
//! from a hex image and [`run::run`] drives a processor while tracing it.

pub mod error;
pub mod loader;
pub mod memory;
pub mod processor;
pub mod run;

pub use error::{Error, LoadError};
pub use processor::{decode, Instruction, Opcode, Processor, State};
pub use run::{run, Outcome, Report};
