use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use wirepulse_core::core::machine::Machine;
use wirepulse_machines::WireBench;

use crate::config::Config;

#[derive(Args)]
pub struct SimArgs {
    /// Wire source file
    pub file: PathBuf,
    /// Top module to elaborate
    #[arg(short, long, default_value = "main")]
    pub top: String,
    /// Clock periods to run
    #[arg(long)]
    pub cycles: Option<u64>,
    /// Wires to print each cycle (comma-separated; `base[k]` works)
    #[arg(long, value_delimiter = ',')]
    pub watch: Vec<String>,
    /// Initial input values as name=value pairs
    #[arg(long, value_name = "NAME=VALUE")]
    pub input: Vec<String>,
    /// Binary image loaded into the circuit's ROM before stepping
    #[arg(long)]
    pub rom: Option<PathBuf>,
}

pub fn run(args: SimArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    let source = std::fs::read_to_string(&args.file)?;
    let mut bench = WireBench::new(&source, &args.top)
        .map_err(|e| format!("{}: {e}", args.file.display()))?;

    if bench.sim().has_cycles() {
        eprintln!("warning: combinational cycle detected; results may be unstable");
    }

    if let Some(rom) = &args.rom {
        let bytes = std::fs::read(rom)?;
        bench.sim_mut().load_rom(&bytes, None);
    }

    for pair in &args.input {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("bad --input '{pair}', expected NAME=VALUE"))?;
        let value = parse_value(value)?;
        bench.sim_mut().set_input(name, value);
    }

    let watch: &[String] = if args.watch.is_empty() {
        &config.watch
    } else {
        &args.watch
    };
    let cycles = args.cycles.unwrap_or(config.max_cycles.min(64));

    if !watch.is_empty() {
        println!("cycle  {}", watch.join("  "));
    }
    for cycle in 0..cycles {
        bench.step();
        if !watch.is_empty() {
            let row: Vec<String> = watch
                .iter()
                .map(|name| format!("{:>width$x}", bench.watch(name), width = name.len()))
                .collect();
            println!("{cycle:>5}  {}", row.join("  "));
        }
    }

    if watch.is_empty() {
        println!(
            "ran {cycles} cycles ({} wires, {} nodes)",
            bench.sim().wire_count(),
            bench.sim().node_count()
        );
    }
    Ok(())
}

fn parse_value(text: &str) -> Result<u32, Box<dyn Error>> {
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = text.strip_prefix('$') {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    Ok(value.map_err(|_| format!("bad value '{text}'"))?)
}
