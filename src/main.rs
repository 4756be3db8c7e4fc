use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use scram::loader::load_image;
use scram::memory::ScramMem;
use scram::Processor;

#[derive(Parser)]
#[command(name = "scram")]
#[command(version)]
#[command(about = "Runs a program on the SCRAM, a 16 byte accumulator machine")]
struct Cli {
    /// Initial memory: whitespace separated hex bytes, loaded from address 0
    #[arg(required_unless_present = "asm", conflicts_with = "asm")]
    image: Option<String>,
    /// Load memory from an assembly source file instead
    #[arg(long, value_name = "FILE")]
    asm: Option<PathBuf>,
    /// Stop after this many cycles (unbounded by default)
    #[arg(short = 'c', long)]
    max_cycles: Option<u64>,
    /// Log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn processor(cli: &Cli) -> Result<Processor> {
    if let Some(path) = &cli.asm {
        let source = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let memory = source.parse::<ScramMem>().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            eyre!("{}", messages.join("\n"))
        })?;
        return Ok(Processor::from(memory));
    }

    let mut processor = Processor::new();
    let image = cli.image.as_deref().unwrap_or_default();
    load_image(&mut processor, image).wrap_err("Failed to load memory image")?;
    Ok(processor)
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(level(cli.verbose))
        .init()
        .map_err(|err| eyre!("Failed to set up logging: {}", err))?;

    let mut processor = processor(&cli)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    scram::run(&mut processor, cli.max_cycles, &mut out)?;
    out.flush()?;

    Ok(())
}
