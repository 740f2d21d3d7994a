pub mod led;
pub mod serial;

pub use led::Led;
pub use serial::SerialPort;
