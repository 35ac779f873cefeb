mod common;

use std::fs;
use std::sync::{Arc, Mutex};

use common::{IDLE_ROM, RomBuilder, gameboy_with};
use dmg_emu_core::cartridge::Cartridge;
use dmg_emu_core::diagnostics::TraceSink;
use dmg_emu_core::error::EmulationError;
use dmg_emu_core::gameboy::{FRAME_CYCLES, GameBoy, Pacer, SavePolicy};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct SharedTrace(Arc<Mutex<Vec<String>>>);

impl TraceSink for SharedTrace {
    fn record(&mut self, line: &str) {
        self.0.lock().unwrap().push(line.to_owned());
    }
}

#[derive(Clone, Default)]
struct CountingPacer(Arc<Mutex<u32>>);

impl Pacer for CountingPacer {
    fn frame_done(&mut self) {
        *self.0.lock().unwrap() += 1;
    }
}

/// Enables cart RAM, stores 0x5A at 0xA000, then spins.
const RAM_WRITER: [u8; 12] = [
    0x3E, 0x0A, // LD A,0x0A
    0xEA, 0x00, 0x00, // LD (0x0000),A
    0x3E, 0x5A, // LD A,0x5A
    0xEA, 0x00, 0xA0, // LD (0xA000),A
    0x18, 0xFE, // JR -2
];

fn battery_rom(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("battery.gb");
    let rom = RomBuilder::new()
        .cart_type(0x03)
        .ram_size(0x02)
        .program(&RAM_WRITER)
        .build();
    fs::write(&path, rom).unwrap();
    path
}

#[test]
fn serial_output_is_captured() {
    let mut gb = gameboy_with(&[
        0x3E, b'H', // LD A,'H'
        0xE0, 0x01, // LDH (SB),A
        0x3E, 0x81, // LD A,0x81
        0xE0, 0x02, // LDH (SC),A
        0x3E, b'i', // LD A,'i'
        0xE0, 0x01, // LDH (SB),A
        0x3E, 0x81, // LD A,0x81
        0xE0, 0x02, // LDH (SC),A
        0x18, 0xFE, // JR -2
    ]);
    gb.run_frame().unwrap();
    assert_eq!(gb.take_serial(), b"Hi".to_vec());
}

#[test]
fn trace_lines_describe_state_before_each_instruction() {
    let mut gb = GameBoy::new();
    gb.load_cart(Cartridge::load(IDLE_ROM.clone()).unwrap());
    let trace = SharedTrace::default();
    gb.set_trace_sink(Some(Box::new(trace.clone())));

    gb.step().unwrap();
    gb.step().unwrap();

    let lines = trace.0.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "A:01 F:B0 B:00 C:13 D:00 E:D8 H:01 L:4D SP:FFFE PC:0100 PCMEM:18,FE,00,00"
    );
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn invalid_opcode_stops_the_session() {
    let mut gb = gameboy_with(&[0xD3]);
    assert_eq!(
        gb.step(),
        Err(EmulationError::InvalidOpcode {
            opcode: 0xD3,
            pc: 0x0100
        })
    );
}

#[test]
fn frames_are_counted_and_paced() {
    let mut gb = GameBoy::new();
    gb.load_cart(Cartridge::load(IDLE_ROM.clone()).unwrap());
    let pacer = CountingPacer::default();
    gb.set_pacer(Box::new(pacer.clone()));

    gb.run_frame().unwrap();
    gb.run_frame().unwrap();
    assert_eq!(gb.frames(), 2);
    assert_eq!(*pacer.0.lock().unwrap(), 2);

    let before = gb.cycles();
    gb.run_frame().unwrap();
    let elapsed = gb.cycles() - before;
    assert!(elapsed.abs_diff(FRAME_CYCLES) < 32, "frame took {elapsed} ticks");
}

#[test]
fn run_frame_returns_with_lcd_off() {
    let mut gb = gameboy_with(&[
        0xAF, // XOR A
        0xE0, 0x40, // LDH (LCDC),A
        0x18, 0xFE, // JR -2
    ]);
    gb.run_frame().unwrap();
    assert!(!gb.mmu.ppu.lcd_enabled());
    assert!(gb.cycles() >= FRAME_CYCLES);
    assert_eq!(gb.frames(), 0);
}

#[test]
fn every_instruction_policy_saves_immediately() {
    let dir = tempdir().unwrap();
    let rom_path = battery_rom(dir.path());
    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    assert_eq!(gb.save_policy(), SavePolicy::EveryInstruction);

    for _ in 0..8 {
        gb.step().unwrap();
    }
    let save = fs::read(rom_path.with_extension("sav")).unwrap();
    assert_eq!(save[0], 0x5A);
    assert!(!gb.mmu.cart_needs_save());
}

#[test]
fn vblank_policy_waits_for_vblank() {
    let dir = tempdir().unwrap();
    let rom_path = battery_rom(dir.path());
    let save_path = rom_path.with_extension("sav");
    let mut gb = GameBoy::new();
    gb.set_save_policy(SavePolicy::VBlank);
    gb.load_rom(&rom_path).unwrap();

    for _ in 0..8 {
        gb.step().unwrap();
    }
    assert!(gb.mmu.cart_needs_save());
    assert!(!save_path.exists());

    gb.run_frame().unwrap();
    assert_eq!(fs::read(&save_path).unwrap()[0], 0x5A);
}

#[test]
fn manual_policy_saves_on_request() {
    let dir = tempdir().unwrap();
    let rom_path = battery_rom(dir.path());
    let save_path = rom_path.with_extension("sav");
    let mut gb = GameBoy::new();
    gb.set_save_policy(SavePolicy::Manual);
    gb.load_rom(&rom_path).unwrap();

    gb.run_frame().unwrap();
    assert!(!save_path.exists());
    gb.save();
    assert_eq!(fs::read(&save_path).unwrap()[0], 0x5A);

    // the save comes back on the next load
    let mut gb = GameBoy::new();
    gb.load_rom(&rom_path).unwrap();
    assert_eq!(gb.cart().unwrap().ram[0], 0x5A);
}

#[test]
fn failed_load_keeps_current_cart() {
    let dir = tempdir().unwrap();
    let mut gb = GameBoy::new();
    gb.load_cart(Cartridge::load(RomBuilder::new().title("KEEP").build()).unwrap());

    let bad = dir.path().join("bad.gb");
    let mut rom = RomBuilder::new().build();
    rom[0x014D] ^= 0x01;
    fs::write(&bad, rom).unwrap();

    assert!(gb.load_rom(&bad).is_err());
    assert!(gb.load_rom(dir.path().join("missing.gb")).is_err());
    assert_eq!(gb.cart().unwrap().title, "KEEP");
}

#[test]
fn reset_keeps_cartridge() {
    let mut gb = gameboy_with(&[0x3C, 0x18, 0xFE]); // INC A ; JR -2
    gb.step().unwrap();
    assert_eq!(gb.cpu.regs.get8(dmg_emu_core::registers::Reg::A), 0x02);
    gb.reset();
    assert_eq!(gb.cpu.regs.pc(), 0x0100);
    assert_eq!(gb.cpu.cycles, 0);
    assert!(gb.cart().is_some());
}
