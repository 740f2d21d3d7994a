//! The Pulse computer: CPU, 64 KiB memory, and a serial/LED console behind
//! the memory-mapped I/O window.

use log::debug;

use wirepulse_core::core::bus::{IoHandler, MappedBus};
use wirepulse_core::core::machine::Machine;
use wirepulse_core::cpu::{P6502, RESET_VECTOR};
use wirepulse_core::device::{Led, SerialPort};
use wirepulse_core::pulse::{Program, assemble};

use crate::registry::{MachineEntry, MachineError};

/// Serial receive data: reading consumes one queued byte, 0 when empty.
pub const SERIAL_RX: u16 = 0xF000;
/// Serial transmit data: writes append to the output buffer.
pub const SERIAL_TX: u16 = 0xF001;
/// Serial status: 1 while receive data is pending.
pub const SERIAL_STATUS: u16 = 0xF002;
/// Output latch; reads return the last written value.
pub const LED: u16 = 0xF030;

/// Console device map for the I/O window. Unmapped addresses read 0 and
/// ignore writes.
#[derive(Default)]
pub struct ConsoleIo {
    pub serial: SerialPort,
    pub led: Led,
}

impl IoHandler for ConsoleIo {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            SERIAL_RX => self.serial.read_data(),
            SERIAL_STATUS => self.serial.status(),
            LED => self.led.read(),
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            SERIAL_TX => self.serial.write_data(value),
            LED => self.led.write(value),
            _ => {}
        }
    }
}

pub struct PulseComputer {
    pub cpu: P6502,
    pub bus: MappedBus<ConsoleIo>,
}

impl Default for PulseComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseComputer {
    pub fn new() -> Self {
        Self {
            cpu: P6502::new(),
            bus: MappedBus::new(ConsoleIo::default()),
        }
    }

    /// Assemble `source` and boot a computer running it.
    pub fn from_source(source: &str) -> Result<Self, MachineError> {
        let program = assemble(source)?;
        let mut computer = Self::new();
        computer.load_program(&program);
        Ok(computer)
    }

    /// Copy the image into memory and reset through the vector. A program
    /// that does not place its own reset vector gets one pointing at its
    /// origin.
    pub fn load_program(&mut self, program: &Program) {
        self.bus.load(program.origin, &program.binary);
        if !program.covers(RESET_VECTOR) {
            self.bus.memory[RESET_VECTOR as usize] = program.origin as u8;
            self.bus.memory[RESET_VECTOR as usize + 1] = (program.origin >> 8) as u8;
        }
        debug!(
            "loaded {} bytes at ${:04X}",
            program.binary.len(),
            program.origin
        );
        self.cpu.reset(&mut self.bus);
    }

    pub fn led(&self) -> u8 {
        self.bus.io.led.read()
    }
}

impl Machine for PulseComputer {
    fn step(&mut self) {
        self.cpu.step(&mut self.bus);
    }

    fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    fn is_halted(&self) -> bool {
        self.cpu.halted
    }

    fn serial_send(&mut self, byte: u8) {
        self.bus.io.serial.queue_input(byte);
    }

    fn serial_take_output(&mut self) -> Vec<u8> {
        self.bus.io.serial.take_output()
    }
}

fn create(source: &str) -> Result<Box<dyn Machine>, MachineError> {
    Ok(Box::new(PulseComputer::from_source(source)?))
}

inventory::submit! {
    MachineEntry::new("computer", "Pulse CPU with 64 KiB RAM and serial console", create)
}
