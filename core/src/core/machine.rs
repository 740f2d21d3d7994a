/// Machine-agnostic interface for runnable systems.
///
/// Each machine (the Pulse computer, the Wire bench) implements this trait to
/// give the frontend a uniform surface. The frontend is a pure driver: it
/// steps the machine and shuttles serial bytes, and does not know about CPUs,
/// netlists, or device maps.
pub trait Machine {
    /// Advance the machine by one step (one instruction, or one clock period
    /// for clocked circuits). A no-op once the machine has halted.
    fn step(&mut self);

    /// Run `steps` steps, stopping early if the machine halts.
    fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            if self.is_halted() {
                break;
            }
            self.step();
        }
    }

    /// Reset to the initial power-on state.
    fn reset(&mut self);

    /// True once the machine has stopped and further steps do nothing.
    fn is_halted(&self) -> bool;

    /// Queue a byte for the machine's serial input. Machines without serial
    /// input discard it.
    fn serial_send(&mut self, byte: u8);

    /// Take all serial output produced since the last call.
    fn serial_take_output(&mut self) -> Vec<u8>;
}
