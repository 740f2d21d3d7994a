//! Public simulator surface: compile a Wire source, then set inputs, step,
//! and read wires by name.
//!
//! Runtime lookups never fail: unknown wire reads return 0 and unknown input
//! writes are no-ops, so diagnostic code stays resilient.

use std::collections::HashMap;

use crate::wire::compiler::compile;
use crate::wire::error::WireError;
use crate::wire::eval::Evaluator;
use crate::wire::flatten::{FlatCircuit, flatten, width_mask};
use crate::wire::lexer::tokenize;
use crate::wire::parser::parse;
use crate::wire::schedule::{Schedule, schedule};

#[derive(Debug)]
pub struct Simulator {
    circuit: FlatCircuit,
    schedule: Schedule,
    eval: Evaluator,
}

/// Compile `source` and elaborate `top` into a runnable simulator.
pub fn create_simulator(source: &str, top: &str) -> Result<Simulator, WireError> {
    let tokens = tokenize(source)?;
    let modules = parse(&tokens)?;
    let compiled = compile(&modules)?;
    if !compiled.contains_key(top) {
        return Err(WireError::UnknownModule(top.to_string()));
    }
    let circuit = flatten(&compiled, top)?;
    let schedule = schedule(&circuit);
    let eval = Evaluator::new(&circuit);
    Ok(Simulator {
        circuit,
        schedule,
        eval,
    })
}

impl Simulator {
    /// Drive a top-level input. The value is masked to the input's width.
    /// Writing an unknown input is a no-op.
    pub fn set_input(&mut self, name: &str, value: u32) {
        if let Some(port) = self.circuit.inputs.iter().find(|p| p.name == name) {
            self.eval.set_value(port.index, value & width_mask(port.width));
        }
    }

    /// Read a top-level output; 0 if the name is unknown.
    pub fn get_output(&self, name: &str) -> u32 {
        match self.circuit.outputs.iter().find(|p| p.name == name) {
            Some(port) => self.eval.value(port.index),
            None => 0,
        }
    }

    /// Read any wire by canonical name; supports `base[k]` and `base[s:e]`
    /// suffixes. Unknown names read as 0.
    pub fn get_wire(&self, name: &str) -> u32 {
        if let Some(index) = self.circuit.wire(name) {
            return self.eval.value(index);
        }
        // `base[k]` / `base[s:e]` parsed post-hoc against the base wire.
        let Some((base, rest)) = name.split_once('[') else {
            return 0;
        };
        let Some(selector) = rest.strip_suffix(']') else {
            return 0;
        };
        let Some(index) = self.circuit.wire(base) else {
            return 0;
        };
        let value = self.eval.value(index);
        match selector.split_once(':') {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) else {
                    return 0;
                };
                if start > end || end >= 32 {
                    return 0;
                }
                (value >> start) & width_mask(end - start + 1)
            }
            None => match selector.parse::<u32>() {
                Ok(bit) if bit < 32 => (value >> bit) & 1,
                _ => 0,
            },
        }
    }

    /// Snapshot of every registered wire name (aliases included).
    pub fn get_all_wires(&self) -> HashMap<String, u32> {
        self.circuit
            .wire_names
            .iter()
            .map(|(name, &index)| (name.clone(), self.eval.value(index)))
            .collect()
    }

    /// See [`Evaluator::load_rom`]; `rom` is the ordinal among ROM nodes.
    pub fn load_rom(&mut self, bytes: &[u8], rom: Option<usize>) {
        self.eval.load_rom(bytes, rom);
    }

    pub fn step(&mut self) {
        self.eval.step(&self.circuit, &self.schedule);
    }

    pub fn run(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.step();
        }
    }

    /// Zero all values and volatile state; ROM contents survive.
    pub fn reset(&mut self) {
        self.eval.reset();
    }

    pub fn wire_count(&self) -> usize {
        self.circuit.wire_count
    }

    pub fn node_count(&self) -> usize {
        self.circuit.nodes.len()
    }

    pub fn has_cycles(&self) -> bool {
        self.schedule.has_cycles
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, u32)> {
        self.circuit.inputs.iter().map(|p| (p.name.as_str(), p.width))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, u32)> {
        self.circuit.outputs.iter().map(|p| (p.name.as_str(), p.width))
    }
}
