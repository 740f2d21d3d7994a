use super::P6502;
use crate::core::bus::Bus;

impl P6502 {
    // ---- Loads (set N, Z) ----

    pub(crate) fn op_lda_imm<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.a = self.fetch_byte(bus);
        self.set_nz(self.a);
    }

    pub(crate) fn op_lda_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        self.a = bus.read(addr);
        self.set_nz(self.a);
    }

    pub(crate) fn op_ldx_imm<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.x = self.fetch_byte(bus);
        self.set_nz(self.x);
    }

    pub(crate) fn op_ldx_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        self.x = bus.read(addr);
        self.set_nz(self.x);
    }

    pub(crate) fn op_ldy_imm<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.y = self.fetch_byte(bus);
        self.set_nz(self.y);
    }

    pub(crate) fn op_ldy_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        self.y = bus.read(addr);
        self.set_nz(self.y);
    }

    // ---- Stores (no flags) ----

    pub(crate) fn op_sta_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        bus.write(addr, self.a);
    }

    pub(crate) fn op_stx_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        bus.write(addr, self.x);
    }

    pub(crate) fn op_sty_abs<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        bus.write(addr, self.y);
    }
}
