//! Single-step CPU validation: a tracing bus, JSON test-vector types, and a
//! replay harness. The `gen_p6502_tests` binary produces gzipped vector
//! files; the test suite replays curated inline vectors plus any generated
//! files it finds.

use serde::{Deserialize, Serialize};

use wirepulse_core::core::bus::Bus;
use wirepulse_core::cpu::P6502;

// --- TracingBus: flat 64 KiB memory with access recording ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusOp {
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Read,
        });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Write,
        });
    }
}

// --- JSON test vector types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub initial: CpuState,
    #[serde(rename = "final")]
    pub final_state: CpuState,
    /// Memory bytes present before the step, as (addr, value).
    #[serde(default)]
    pub ram: Vec<(u16, u8)>,
    /// Memory bytes expected after the step, as (addr, value).
    #[serde(default)]
    pub ram_final: Vec<(u16, u8)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,
    #[serde(default)]
    pub halted: bool,
}

impl CpuState {
    pub fn apply(&self, cpu: &mut P6502) {
        cpu.a = self.a;
        cpu.x = self.x;
        cpu.y = self.y;
        cpu.sp = self.sp;
        cpu.pc = self.pc;
        cpu.p = self.p;
        cpu.halted = self.halted;
    }

    pub fn capture(cpu: &P6502) -> Self {
        Self {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            sp: cpu.sp,
            pc: cpu.pc,
            p: cpu.p,
            halted: cpu.halted,
        }
    }
}

/// Execute one instruction from the case's initial state and compare the
/// resulting CPU state and memory. Returns a description of the first
/// mismatch.
pub fn run_case(case: &TestCase) -> Result<(), String> {
    let mut cpu = P6502::new();
    let mut bus = TracingBus::new();
    case.initial.apply(&mut cpu);
    for &(addr, value) in &case.ram {
        bus.memory[addr as usize] = value;
    }

    cpu.step(&mut bus);

    let got = CpuState::capture(&cpu);
    let want = &case.final_state;
    let fields = [
        ("a", got.a as u16, want.a as u16),
        ("x", got.x as u16, want.x as u16),
        ("y", got.y as u16, want.y as u16),
        ("sp", got.sp as u16, want.sp as u16),
        ("pc", got.pc, want.pc),
        ("p", got.p as u16, want.p as u16),
        ("halted", got.halted as u16, want.halted as u16),
    ];
    for (field, got, want) in fields {
        if got != want {
            return Err(format!(
                "{}: {field} = {got:#04X}, expected {want:#04X}",
                case.name
            ));
        }
    }
    for &(addr, value) in &case.ram_final {
        let got = bus.memory[addr as usize];
        if got != value {
            return Err(format!(
                "{}: mem[{addr:#06X}] = {got:#04X}, expected {value:#04X}",
                case.name
            ));
        }
    }
    Ok(())
}
