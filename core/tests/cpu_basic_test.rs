use wirepulse_core::core::bus::Bus;
use wirepulse_core::cpu::{P6502, StatusFlag};
mod common;
use common::TestBus;

#[test]
fn reset_reads_vector_and_initializes_state() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.set_reset_vector(0x0200);

    cpu.reset(&mut bus);
    assert_eq!(cpu.pc, 0x0200);
    assert_eq!(cpu.sp, 0xFF);
    assert_eq!(cpu.a, 0);
    assert!(cpu.flag(StatusFlag::I));
    assert!(!cpu.halted);
    assert_eq!(cpu.cycles, 0);
}

#[test]
fn read_word_wraps_at_top_of_memory() {
    let mut bus = TestBus::new();
    bus.memory[0xFFFF] = 0x34;
    bus.memory[0x0000] = 0x12;
    assert_eq!(bus.read_word(0xFFFF), 0x1234);
}

#[test]
fn lda_immediate_sets_flags() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xA9, 0x42]);

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.pc, 2);
    assert!(!cpu.flag(StatusFlag::Z));
    assert!(!cpu.flag(StatusFlag::N));

    // LDA #$00 sets Z; LDA #$80 sets N.
    bus.load(2, &[0xA9, 0x00, 0xA9, 0x80]);
    cpu.step(&mut bus);
    assert!(cpu.flag(StatusFlag::Z));
    cpu.step(&mut bus);
    assert!(cpu.flag(StatusFlag::N));
    assert!(!cpu.flag(StatusFlag::Z));
}

#[test]
fn load_store_absolute_roundtrip() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    // LDA #$99; STA $0300; LDX $0300; LDY $0300
    bus.load(
        0,
        &[0xA9, 0x99, 0x8D, 0x00, 0x03, 0xAE, 0x00, 0x03, 0xAC, 0x00, 0x03],
    );
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.memory[0x0300], 0x99);
    assert_eq!(cpu.x, 0x99);
    assert_eq!(cpu.y, 0x99);
}

#[test]
fn transfers_and_inc_dec() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    // LDA #$10; TAX; INX; INX; DEX; TXA
    bus.load(0, &[0xA9, 0x10, 0xAA, 0xE8, 0xE8, 0xCA, 0x8A]);
    for _ in 0..6 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.a, 0x11);
    assert_eq!(cpu.x, 0x11);
}

#[test]
fn inx_wraps_and_sets_zero() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xA2, 0xFF, 0xE8]); // LDX #$FF; INX
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.x, 0);
    assert!(cpu.flag(StatusFlag::Z));
}

#[test]
fn txs_does_not_touch_flags() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xA2, 0x00, 0x9A]); // LDX #$00 (sets Z); TXS
    cpu.step(&mut bus);
    let before = cpu.p;
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0);
    assert_eq!(cpu.p, before);
}

#[test]
fn hlt_stops_the_cpu() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x02, 0xA9, 0x42]); // HLT; LDA #$42 (never runs)
    cpu.step(&mut bus);
    assert!(cpu.halted);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0);
    assert_eq!(cpu.cycles, 1);
}

#[test]
fn unknown_opcode_halts() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xFF]);
    cpu.step(&mut bus);
    assert!(cpu.halted);
}

#[test]
fn brk_halts() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00]);
    cpu.step(&mut bus);
    assert!(cpu.halted);
}

#[test]
fn run_stops_at_cycle_budget() {
    let mut cpu = P6502::new();
    let mut bus = TestBus::new();
    // Endless NOPs.
    bus.memory.fill(0xEA);
    let executed = cpu.run(&mut bus, 1000);
    assert_eq!(executed, 1000);
    assert!(!cpu.halted);
}
