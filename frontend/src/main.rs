mod asm;
mod config;
mod run;
mod sim;

use clap::{Parser, Subcommand};
use wirepulse_machines::registry;

#[derive(Parser)]
#[command(name = "wirepulse", version, about = "Wire HDL simulator and Pulse assembler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a Pulse source file
    Asm(asm::AsmArgs),
    /// Assemble a Pulse program and run it on a machine
    Run(run::RunArgs),
    /// Compile a Wire source and step it with a driven clock
    Sim(sim::SimArgs),
    /// List available machines
    Machines,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = config::Config::load();

    let result = match cli.command {
        Command::Asm(args) => asm::run(args),
        Command::Run(args) => run::run(args, &config),
        Command::Sim(args) => sim::run(args, &config),
        Command::Machines => {
            for entry in registry::all() {
                println!("{:10} {}", entry.name, entry.description);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
