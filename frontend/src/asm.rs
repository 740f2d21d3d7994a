use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use wirepulse_core::pulse::assemble;

#[derive(Args)]
pub struct AsmArgs {
    /// Pulse source file
    pub file: PathBuf,
    /// Write the raw binary image here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print an address/bytes listing
    #[arg(long)]
    pub listing: bool,
}

pub fn run(args: AsmArgs) -> Result<(), Box<dyn Error>> {
    let source = std::fs::read_to_string(&args.file)?;
    let program = assemble(&source)
        .map_err(|e| format!("{}: {e}", args.file.display()))?;

    println!(
        "origin ${:04X}, {} bytes, {} symbols",
        program.origin,
        program.binary.len(),
        program.symbols.len()
    );

    let mut symbols: Vec<_> = program.symbols.iter().collect();
    symbols.sort_by_key(|(name, _)| name.as_str());
    for (name, addr) in symbols {
        println!("  {name} = ${addr:04X}");
    }

    if args.listing {
        print!("{}", program.listing(&source));
    }

    if let Some(output) = &args.output {
        std::fs::write(output, &program.binary)?;
        println!("wrote {} bytes to {}", program.binary.len(), output.display());
    }

    Ok(())
}
