//! Serial port device: a receive queue filled by the host and a transmit
//! buffer drained by the host. Register decode belongs to the machine; this
//! is just the data path.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct SerialPort {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl SerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host side: queue a byte for the program to read.
    pub fn queue_input(&mut self, byte: u8) {
        self.rx.push_back(byte);
    }

    /// Data register read: consume one RX byte, 0 when the queue is empty.
    pub fn read_data(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    /// Data register write: append to the transmit buffer.
    pub fn write_data(&mut self, byte: u8) {
        self.tx.push(byte);
    }

    /// Status register: 1 while RX has pending bytes.
    pub fn status(&self) -> u8 {
        u8::from(!self.rx.is_empty())
    }

    /// Host side: take everything transmitted since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn clear(&mut self) {
        self.rx.clear();
        self.tx.clear();
    }
}
