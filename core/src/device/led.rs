//! Output latch device: the last written value reads back.

#[derive(Debug, Default)]
pub struct Led {
    value: u8,
}

impl Led {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u8) {
        self.value = value;
    }

    pub fn read(&self) -> u8 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_last_written_value() {
        let mut led = Led::new();
        assert_eq!(led.read(), 0);
        led.write(0xA5);
        assert_eq!(led.read(), 0xA5);
    }
}
