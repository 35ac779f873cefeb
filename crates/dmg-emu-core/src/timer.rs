use crate::interrupt::{Interrupt, Interrupts};

/// Ticks between TIMA increments, indexed by TAC bits 0-1.
const TIMA_PERIODS: [u16; 4] = [1024, 16, 64, 256];

/// Ticks spent in the overflow window before TMA is reloaded.
const OVERFLOW_WINDOW: u8 = 4;

/// Tick on which the reload decision is latched, if TIMA is still zero.
const OVERFLOW_LATCH_TICK: u8 = 3;

/// DIV phase left behind by the DMG boot ROM.
pub const BOOT_DIV: u16 = 0xABCC;

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control, low three bits only
    pub tac: u8,
    /// TIMA wrapped and the reload has not happened yet
    overflow: bool,
    /// Ticks elapsed since the wrap
    overflow_ticks: u8,
    /// TIMA was still zero on the latch tick, so the reload goes ahead
    reload_latched: bool,
    /// The reload is being applied this tick
    reloading: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: BOOT_DIV,
            tima: 0,
            tma: 0,
            tac: 0,
            overflow: false,
            overflow_ticks: 0,
            reload_latched: false,
            reloading: false,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => self.div = 0,
            0xFF05 => {
                // the tick that reloads TIMA wins over a CPU write
                if self.reloading {
                    return;
                }
                self.tima = val;
                self.cancel_overflow();
            }
            0xFF06 => {
                self.tma = val;
                if self.reloading {
                    self.tima = val;
                }
            }
            0xFF07 => {
                self.tac = val & 0x07;
                if !self.enabled() {
                    self.cancel_overflow();
                }
            }
            _ => {}
        }
    }

    /// Advance the timer by `ticks` and raise the Timer interrupt when a
    /// reload completes.
    pub fn step(&mut self, ticks: u16, ints: &mut Interrupts) {
        for _ in 0..ticks {
            self.tick(ints);
        }
    }

    fn tick(&mut self, ints: &mut Interrupts) {
        self.reloading = false;
        self.div = self.div.wrapping_add(1);

        if !self.enabled() {
            self.cancel_overflow();
            return;
        }

        if self.overflow {
            self.overflow_ticks += 1;
            if self.overflow_ticks == OVERFLOW_LATCH_TICK && self.tima == 0 {
                self.reload_latched = true;
            }
            if self.overflow_ticks == OVERFLOW_WINDOW {
                if self.reload_latched {
                    self.tima = self.tma;
                    self.reloading = true;
                    ints.request(Interrupt::Timer);
                }
                self.cancel_overflow();
            }
            return;
        }

        if self.div % self.period() == 0 {
            self.tima = self.tima.wrapping_add(1);
            if self.tima == 0 {
                self.overflow = true;
                self.overflow_ticks = 0;
                self.reload_latched = false;
            }
        }
    }

    fn cancel_overflow(&mut self) {
        self.overflow = false;
        self.overflow_ticks = 0;
        self.reload_latched = false;
    }

    #[inline]
    fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    #[inline]
    fn period(&self) -> u16 {
        TIMA_PERIODS[(self.tac & 0x03) as usize]
    }

    /// Whether TIMA has wrapped and is waiting for its reload.
    pub fn in_overflow(&self) -> bool {
        self.overflow
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
