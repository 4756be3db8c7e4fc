//! The cycle loop that drives a [`Processor`] and traces every step.

use std::fmt;
use std::io::{self, Write};

use log::*;

use crate::error::Error;
use crate::processor::Processor;

/// Why the cycle loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A step failed with the contained error
    Interrupted(Error),
    Halted,
    CycleLimit,
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Instructions executed successfully
    pub cycles: u64,
    pub outcome: Outcome,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Interrupted(_) => write!(f, "Interrupted after {} cycles", self.cycles),
            Outcome::Halted => write!(f, "Halted after {} cycles", self.cycles),
            Outcome::CycleLimit => {
                write!(f, "Reached cycle limit after {} cycles", self.cycles)
            }
        }
    }
}

/// Steps `processor` until it halts, fails, or `max_cycles` instructions
/// have run, writing a snapshot line after every instruction to `out`.
///
/// Processor errors end the loop and are reported through [`Outcome`];
/// only failures to write to `out` are returned as errors.
pub fn run<W: Write>(
    processor: &mut Processor,
    max_cycles: Option<u64>,
    out: &mut W,
) -> io::Result<Report> {
    let mut cycles = 0;
    let mut interrupted = None;

    writeln!(out, "Start: {}", processor)?;
    while !processor.is_halted() && max_cycles.map_or(true, |max| cycles < max) {
        if let Err(err) = processor.step() {
            error!("runtime error after {} cycles: {}", cycles, err);
            writeln!(out, "Runtime error: {}", err)?;
            interrupted = Some(err);
            break;
        }
        writeln!(out, "{:04} : {}", cycles, processor)?;
        cycles += 1;
    }

    let outcome = match interrupted {
        Some(err) => Outcome::Interrupted(err),
        None if processor.is_halted() => Outcome::Halted,
        None => Outcome::CycleLimit,
    };
    let report = Report { cycles, outcome };

    info!("{}", report);
    writeln!(out, "{}", report)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_image;
    use color_eyre::eyre::Result;

    fn trace(image: &str, max_cycles: Option<u64>) -> Result<(Report, Vec<String>)> {
        let mut cpu = Processor::new();
        load_image(&mut cpu, image)?;

        let mut out = Vec::new();
        let report = run(&mut cpu, max_cycles, &mut out)?;
        let lines = String::from_utf8(out)?
            .lines()
            .map(str::to_owned)
            .collect();

        Ok((report, lines))
    }

    #[test]
    fn run_until_halt() -> Result<()> {
        let (report, lines) = trace("51 05 00", None)?;

        assert_eq!(
            report,
            Report {
                cycles: 2,
                outcome: Outcome::Halted
            }
        );
        assert_eq!(
            lines,
            vec![
                "Start: 51 05 00 00 00 00 00 00 00 00 00 00 00 00 00 00 A=00 PC=0",
                "0000 : 51 05 00 00 00 00 00 00 00 00 00 00 00 00 00 00 A=05 PC=1",
                "0001 : 51 05 00 00 00 00 00 00 00 00 00 00 00 00 00 00 A=05 PC=2",
                "Halted after 2 cycles",
            ]
        );

        Ok(())
    }

    #[test]
    fn run_into_cycle_limit() -> Result<()> {
        let (report, lines) = trace("70", Some(3))?;

        assert_eq!(report.cycles, 3);
        assert_eq!(report.outcome, Outcome::CycleLimit);
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[3],
            "0002 : 70 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 A=00 PC=0"
        );
        assert_eq!(lines[4], "Reached cycle limit after 3 cycles");

        Ok(())
    }

    #[test]
    fn run_zero_cycles() -> Result<()> {
        let (report, lines) = trace("00", Some(0))?;

        assert_eq!(report.outcome, Outcome::CycleLimit);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Reached cycle limit after 0 cycles");

        Ok(())
    }

    #[test]
    fn run_interrupted_by_illegal_opcode() -> Result<()> {
        let (report, lines) = trace("1f 90", None)?;

        assert_eq!(report.cycles, 1);
        assert_eq!(
            report.outcome,
            Outcome::Interrupted(Error::IllegalOpcode { opcode: 9 })
        );
        assert_eq!(
            &lines[2..],
            &[
                "Runtime error: Illegal instruction code: 9".to_owned(),
                "Interrupted after 1 cycles".to_owned(),
            ]
        );

        Ok(())
    }

    #[test]
    fn run_off_the_end_of_memory() -> Result<()> {
        // JMP 15, then LDA 0 at address 15 moves the PC to 16
        let image = "7f 00 00 00 00 00 00 00 00 00 00 00 00 00 00 10";
        let (report, lines) = trace(image, None)?;

        assert_eq!(report.cycles, 2);
        assert_eq!(
            report.outcome,
            Outcome::Interrupted(Error::OutOfRange { address: 16 })
        );
        assert!(lines[2].ends_with("A=7f PC=10"));
        assert_eq!(lines[3], "Runtime error: Bad address: 16");

        Ok(())
    }

    #[test]
    fn run_after_fault() -> Result<()> {
        let mut cpu = Processor::new();
        cpu.write_memory(0, 0x90)?;
        let illegal = Error::IllegalOpcode { opcode: 9 };
        assert_eq!(cpu.step(), Err(illegal.clone()));

        let mut out = Vec::new();
        let report = run(&mut cpu, None, &mut out)?;
        let lines: Vec<String> = String::from_utf8(out)?
            .lines()
            .map(str::to_owned)
            .collect();

        assert_eq!(report.cycles, 0);
        assert_eq!(
            report.outcome,
            Outcome::Interrupted(Error::Faulted(Box::new(illegal)))
        );
        assert_eq!(
            &lines[1..],
            &[
                "Runtime error: SCRAM faulted: Illegal instruction code: 9".to_owned(),
                "Interrupted after 0 cycles".to_owned(),
            ]
        );

        Ok(())
    }

    #[test]
    fn run_already_halted() -> Result<()> {
        let mut cpu = Processor::new();
        cpu.step()?;

        let mut out = Vec::new();
        let report = run(&mut cpu, None, &mut out)?;

        assert_eq!(report.cycles, 0);
        assert_eq!(report.outcome, Outcome::Halted);

        Ok(())
    }
}
