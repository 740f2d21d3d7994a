pub mod ast;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod flatten;
pub mod lexer;
pub mod netlist;
pub mod parser;
pub mod schedule;
pub mod simulator;

pub use error::WireError;
pub use simulator::{Simulator, create_simulator};
