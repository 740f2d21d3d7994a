//! Wire bench: wraps a simulator and drives its clock, for circuits whose
//! top module exposes a 1-bit `clk` input.

use wirepulse_core::core::machine::Machine;
use wirepulse_core::wire::{Simulator, WireError, create_simulator};

use crate::registry::{MachineEntry, MachineError};

pub struct WireBench {
    sim: Simulator,
    has_clock: bool,
}

impl WireBench {
    pub fn new(source: &str, top: &str) -> Result<Self, WireError> {
        let sim = create_simulator(source, top)?;
        let has_clock = sim.inputs().any(|(name, width)| name == "clk" && width == 1);
        Ok(Self { sim, has_clock })
    }

    pub fn sim(&self) -> &Simulator {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    pub fn watch(&self, name: &str) -> u32 {
        self.sim.get_wire(name)
    }
}

impl Machine for WireBench {
    /// One full clock period when the top module has a `clk` input,
    /// otherwise a single evaluation pass.
    fn step(&mut self) {
        if self.has_clock {
            self.sim.set_input("clk", 0);
            self.sim.step();
            self.sim.set_input("clk", 1);
            self.sim.step();
        } else {
            self.sim.step();
        }
    }

    fn reset(&mut self) {
        self.sim.reset();
    }

    fn is_halted(&self) -> bool {
        false
    }

    fn serial_send(&mut self, _byte: u8) {}

    fn serial_take_output(&mut self) -> Vec<u8> {
        Vec::new()
    }
}

fn create(source: &str) -> Result<Box<dyn Machine>, MachineError> {
    Ok(Box::new(WireBench::new(source, "main")?))
}

inventory::submit! {
    MachineEntry::new("bench", "Wire circuit bench (top module 'main', clocked via 'clk')", create)
}
