//! IF/IE register pair and fixed-priority selection.
//!
//! See gbdev.io/pandocs/Interrupts.html for vectors and bit layout.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// All sources, highest priority first.
    pub const PRIORITY: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }

    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Interrupts {
    /// IF, requested sources.
    pub flags: u8,
    /// IE, enabled sources.
    pub enable: u8,
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            flags: 0xE1,
            enable: 0,
        }
    }

    #[inline]
    pub fn request(&mut self, source: Interrupt) {
        self.flags |= source.bit();
    }

    #[inline]
    pub fn acknowledge(&mut self, source: Interrupt) {
        self.flags &= !source.bit();
    }

    /// Sources that are both requested and enabled.
    #[inline]
    pub fn pending(&self) -> u8 {
        self.flags & self.enable & 0x1F
    }

    pub fn highest_pending(&self) -> Option<Interrupt> {
        let pending = self.pending();
        Interrupt::PRIORITY
            .into_iter()
            .find(|source| pending & source.bit() != 0)
    }

    /// IF reads back with the unused upper bits set.
    pub fn read_flags(&self) -> u8 {
        self.flags | 0xE0
    }

    pub fn write_flags(&mut self, val: u8) {
        self.flags = val & 0x1F;
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}
