pub mod pulse_computer;
pub mod registry;
pub mod wire_bench;

pub use pulse_computer::PulseComputer;
pub use registry::{MachineEntry, MachineError};
pub use wire_bench::WireBench;
