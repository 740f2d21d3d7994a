pub mod bus;
pub mod machine;

pub use bus::{Bus, IoHandler, MappedBus};
pub use machine::Machine;
