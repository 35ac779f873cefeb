use log::{debug, trace, warn};

use crate::{
    cartridge::Cartridge,
    dma::Dma,
    interrupt::Interrupts,
    joypad::{Button, Joypad},
    ppu::Ppu,
    serial::Serial,
    timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

/// The DMG address space.
///
/// ```text
/// 0000-3FFF  ROM bank 0 (or MBC1 mode-1 bank)
/// 4000-7FFF  switchable ROM bank
/// 8000-9FFF  VRAM
/// A000-BFFF  cartridge RAM
/// C000-DFFF  WRAM
/// E000-FDFF  echo of C000-DDFF
/// FE00-FE9F  OAM
/// FEA0-FEFF  unusable
/// FF00-FF7F  I/O registers
/// FF80-FFFE  HRAM
/// FFFF       IE
/// ```
pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub ints: Interrupts,
    pub serial: Serial,
    pub ppu: Ppu,
    pub timer: Timer,
    pub joypad: Joypad,
    pub dma: Dma,
    /// Write dirty battery RAM to disk whenever VBlank starts.
    pub save_on_vblank: bool,
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            ints: Interrupts::new(),
            serial: Serial::new(),
            ppu: Ppu::new(),
            timer: Timer::new(),
            joypad: Joypad::new(),
            dma: Dma::new(),
            save_on_vblank: false,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn cart_needs_save(&self) -> bool {
        self.cart.as_ref().is_some_and(|c| c.needs_save())
    }

    pub fn save_cart_ram(&mut self) {
        if let Some(cart) = &mut self.cart
            && let Err(e) = cart.save_ram()
        {
            warn!("Failed to save RAM: {e}");
        }
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => {
                // the DMA engine owns the OAM bus while it runs
                if self.dma.active() {
                    0xFF
                } else {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.joypad.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.ints.read_flags(),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            // sound and unused I/O
            0xFF03 | 0xFF08..=0xFF0E | 0xFF10..=0xFF3F | 0xFF4C..=0xFF7F => 0xFF,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ints.enable,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.joypad.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val, &mut self.ints),
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.ints.write_flags(val),
            0xFF46 => {
                self.ppu.dma = val;
                self.dma.start(val);
            }
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val),
            0xFF03 | 0xFF08..=0xFF0E | 0xFF10..=0xFF3F | 0xFF4C..=0xFF7F => {
                trace!("Ignoring write {val:02X} to unused I/O {addr:04X}");
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ints.enable = val,
        }
    }

    /// Little-endian 16-bit read.
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Little-endian 16-bit write, low byte first.
    pub fn write_word(&mut self, addr: u16, val: u16) {
        self.write_byte(addr, val as u8);
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// Copy the next OAM DMA byte, if the engine has one due.
    pub fn dma_step(&mut self) {
        if let Some(transfer) = self.dma.tick() {
            let val = self.read_byte(transfer.src);
            self.write_byte(transfer.dst, val);
        }
    }

    /// Hook for the start of VBlank.
    pub fn vblank_started(&mut self) {
        if self.save_on_vblank && self.cart_needs_save() {
            debug!("Flushing battery RAM at VBlank");
            self.save_cart_ram();
        }
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.joypad.set_button(button, pressed, &mut self.ints);
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
