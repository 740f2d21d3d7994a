pub mod core;
pub mod cpu;
pub mod device;
pub mod pulse;
pub mod wire;

pub mod prelude {
    pub use crate::core::machine::Machine;
    pub use crate::core::{Bus, IoHandler, MappedBus};
    pub use crate::cpu::P6502;
    pub use crate::pulse::assemble;
    pub use crate::wire::Simulator;
}
