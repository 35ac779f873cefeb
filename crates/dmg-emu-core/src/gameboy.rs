use std::path::Path;

use log::info;

use crate::{
    cartridge::Cartridge,
    cpu::Cpu,
    diagnostics::{self, TraceSink},
    error::{CartridgeError, EmulationError},
    joypad::Button,
    mmu::Mmu,
    ppu::{LINE_CYCLES, LINES_PER_FRAME, SCREEN_HEIGHT, SCREEN_WIDTH, Shade},
};

/// Ticks in one full frame of 154 scanlines.
pub const FRAME_CYCLES: u64 = LINE_CYCLES as u64 * LINES_PER_FRAME as u64;

/// DMG frame rate in Hz.
pub const FRAME_RATE: f64 = 59.7275;

/// Rate limiter consulted once per completed frame.
pub trait Pacer: Send {
    fn frame_done(&mut self);
}

/// Runs as fast as the host allows.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn frame_done(&mut self) {}
}

/// When dirty battery RAM gets written back to the save file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// Poll the dirty flag after every instruction.
    #[default]
    EveryInstruction,
    /// Flush at the start of each VBlank.
    VBlank,
    /// Only on an explicit [`GameBoy::save`].
    Manual,
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    save_policy: SavePolicy,
    trace: Option<Box<dyn TraceSink>>,
    pacer: Box<dyn Pacer>,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
            save_policy: SavePolicy::default(),
            trace: None,
            pacer: Box::new(NoPacing),
        }
    }

    /// Load a ROM file, replacing any cartridge already inserted. On failure
    /// the previous cartridge stays in place.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CartridgeError> {
        let cart = Cartridge::from_file(path)?;
        self.load_cart(cart);
        Ok(())
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        info!("Inserted cartridge \"{}\"", cart.title);
        self.mmu.load_cart(cart);
    }

    pub fn cart(&self) -> Option<&Cartridge> {
        self.mmu.cart.as_ref()
    }

    /// Return to the post-boot state, keeping the cartridge and the
    /// configured collaborators.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        self.mmu.save_on_vblank = self.save_policy == SavePolicy::VBlank;
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }

    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    pub fn set_save_policy(&mut self, policy: SavePolicy) {
        self.save_policy = policy;
        self.mmu.save_on_vblank = policy == SavePolicy::VBlank;
    }

    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }

    pub fn set_pacer(&mut self, pacer: Box<dyn Pacer>) {
        self.pacer = pacer;
    }

    /// Execute one instruction (or one halted machine cycle).
    pub fn step(&mut self) -> Result<(), EmulationError> {
        if let Some(sink) = self.trace.as_mut()
            && !self.cpu.halted
        {
            let pc = self.cpu.regs.pc();
            let pcmem = [0u16, 1, 2, 3].map(|i| self.mmu.read_byte(pc.wrapping_add(i)));
            sink.record(&diagnostics::trace_line(&self.cpu.regs, pcmem));
        }

        self.cpu.step(&mut self.mmu)?;

        if self.save_policy == SavePolicy::EveryInstruction && self.mmu.cart_needs_save() {
            self.mmu.save_cart_ram();
        }
        Ok(())
    }

    /// Run until the PPU completes a frame. With the LCD off no frame is
    /// ever produced, so a frame's worth of ticks counts as one.
    pub fn run_frame(&mut self) -> Result<(), EmulationError> {
        let start = self.cpu.cycles;
        loop {
            self.step()?;
            if self.mmu.ppu.frame_ready() {
                self.mmu.ppu.clear_frame_flag();
                break;
            }
            if !self.mmu.ppu.lcd_enabled() && self.cpu.cycles - start >= FRAME_CYCLES {
                break;
            }
        }
        self.pacer.frame_done();
        Ok(())
    }

    /// Run at least `ticks` clock ticks, stopping on an instruction boundary.
    pub fn run_cycles(&mut self, ticks: u64) -> Result<(), EmulationError> {
        let target = self.cpu.cycles.saturating_add(ticks);
        while self.cpu.cycles < target {
            self.step()?;
            if self.mmu.ppu.frame_ready() {
                self.mmu.ppu.clear_frame_flag();
                self.pacer.frame_done();
            }
        }
        Ok(())
    }

    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    pub fn frames(&self) -> u64 {
        self.mmu.ppu.frames()
    }

    pub fn framebuffer(&self) -> &[Shade; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.framebuffer()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.mmu.set_button(button, pressed);
    }

    /// Drain bytes the program has sent over the serial port.
    pub fn take_serial(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }

    /// Write battery RAM to disk if it changed since the last save.
    pub fn save(&mut self) {
        if self.mmu.cart_needs_save() {
            self.mmu.save_cart_ram();
        }
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
