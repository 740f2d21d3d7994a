use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use wirepulse_core::core::machine::Machine;
use wirepulse_machines::registry;

use crate::config::Config;

#[derive(Args)]
pub struct RunArgs {
    /// Pulse source file
    pub file: PathBuf,
    /// Machine to run on (see `wirepulse machines`)
    #[arg(short, long, default_value = "computer")]
    pub machine: String,
    /// Stop after this many steps
    #[arg(long)]
    pub max_cycles: Option<u64>,
    /// Pre-queue these bytes on the serial input
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run(args: RunArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    let entry = registry::find(&args.machine)
        .ok_or_else(|| format!("unknown machine '{}'", args.machine))?;
    let source = std::fs::read_to_string(&args.file)?;
    let mut machine =
        (entry.create)(&source).map_err(|e| format!("{}: {e}", args.file.display()))?;

    if let Some(input) = &args.input {
        for byte in input.bytes() {
            machine.serial_send(byte);
        }
    }

    let budget = args.max_cycles.unwrap_or(config.max_cycles);
    machine.run(budget);

    let output = machine.serial_take_output();
    if !output.is_empty() {
        std::io::stdout().write_all(&output)?;
        if output.last() != Some(&b'\n') {
            println!();
        }
    }

    if machine.is_halted() {
        println!("halted");
    } else {
        println!("stopped after {budget} steps");
    }
    Ok(())
}
