use std::io;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use log::LevelFilter;
use pipevm::Machine;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(name = "pipevm", version, about = "Run a program on the two-component virtual machine")]
struct Cli {
    /// Program file to load into memory
    program: PathBuf,

    /// Cycles between timer interrupts
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    timer: u32,

    /// Diagnostics level. Logs share stdout with the program, so they are off
    /// unless asked for.
    #[arg(long, default_value = "off")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let cli = Cli::parse();
    SimpleLogger::new().with_level(cli.log_level).init()?; // logging

    let machine = Machine::from_file(&cli.program, cli.timer)?;
    let stdout = io::stdout();
    machine.run(&mut stdout.lock())?;

    Ok(())
}
