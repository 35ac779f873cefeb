#![allow(dead_code)]

use dmg_emu_core::{cartridge::Cartridge, cartridge::header_checksum, gameboy::GameBoy};
use once_cell::sync::Lazy;

pub const ROM_BANK_SIZE: usize = 0x4000;

/// Offset inside every bank where the builder stamps the bank number.
pub const BANK_MARKER: usize = 0x3000;

/// 32 KiB ROM-only image whose entry point spins on `JR -2`.
pub static IDLE_ROM: Lazy<Vec<u8>> = Lazy::new(|| RomBuilder::new().program(&[0x18, 0xFE]).build());

/// Assembles minimal images with a valid header.
pub struct RomBuilder {
    cart_type: u8,
    rom_code: u8,
    ram_code: u8,
    title: String,
    program: Vec<u8>,
    patches: Vec<(usize, Vec<u8>)>,
}

impl RomBuilder {
    pub fn new() -> Self {
        Self {
            cart_type: 0x00,
            rom_code: 0x00,
            ram_code: 0x00,
            title: "TEST".to_string(),
            program: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn cart_type(mut self, code: u8) -> Self {
        self.cart_type = code;
        self
    }

    pub fn rom_size(mut self, code: u8) -> Self {
        self.rom_code = code;
        self
    }

    pub fn ram_size(mut self, code: u8) -> Self {
        self.ram_code = code;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Code placed at the 0x0100 entry point; at most four bytes fit before
    /// the header, so longer programs jump to 0x0150.
    pub fn program(mut self, code: &[u8]) -> Self {
        self.program = code.to_vec();
        self
    }

    pub fn at(mut self, addr: usize, bytes: &[u8]) -> Self {
        self.patches.push((addr, bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let len = (32 * 1024) << self.rom_code;
        let mut rom = vec![0u8; len];

        for bank in 0..len / ROM_BANK_SIZE {
            rom[bank * ROM_BANK_SIZE + BANK_MARKER] = bank as u8;
        }

        if self.program.len() <= 4 {
            rom[0x0100..0x0100 + self.program.len()].copy_from_slice(&self.program);
        } else {
            // JP 0x0150
            rom[0x0100..0x0104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
            rom[0x0150..0x0150 + self.program.len()].copy_from_slice(&self.program);
        }

        for (addr, bytes) in &self.patches {
            rom[*addr..*addr + bytes.len()].copy_from_slice(bytes);
        }

        let title = self.title.as_bytes();
        let n = title.len().min(15);
        rom[0x0134..0x0134 + n].copy_from_slice(&title[..n]);
        rom[0x0147] = self.cart_type;
        rom[0x0148] = self.rom_code;
        rom[0x0149] = self.ram_code;
        rom[0x014D] = header_checksum(&rom);
        rom
    }
}

impl Default for RomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A machine with `program` loaded at the entry point.
pub fn gameboy_with(program: &[u8]) -> GameBoy {
    let cart = Cartridge::load(RomBuilder::new().program(program).build()).unwrap();
    let mut gb = GameBoy::new();
    gb.load_cart(cart);
    gb
}
