use crate::bits::{U8, U16};

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// Register names, including the combined pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

impl Reg {
    pub const fn is_16bit(self) -> bool {
        matches!(self, Reg::AF | Reg::BC | Reg::DE | Reg::HL | Reg::SP | Reg::PC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Z,
    N,
    H,
    C,
}

impl Flag {
    const fn mask(self) -> u8 {
        match self {
            Flag::Z => FLAG_Z,
            Flag::N => FLAG_N,
            Flag::H => FLAG_H,
            Flag::C => FLAG_C,
        }
    }
}

/// Per-flag effect of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagUpdate {
    #[default]
    Keep,
    Clear,
    Set,
}

impl From<bool> for FlagUpdate {
    fn from(on: bool) -> Self {
        if on { FlagUpdate::Set } else { FlagUpdate::Clear }
    }
}

/// An 8-bit cell tagged with the register it backs.
#[derive(Debug, Clone, Copy)]
pub struct Register8 {
    pub name: Reg,
    pub value: U8,
}

/// A 16-bit cell tagged with the register it backs.
#[derive(Debug, Clone, Copy)]
pub struct Register16 {
    pub name: Reg,
    pub value: U16,
}

impl Register8 {
    const fn new(name: Reg, value: u8) -> Self {
        Self {
            name,
            value: U8::new(value),
        }
    }
}

impl Register16 {
    const fn new(name: Reg, value: u16) -> Self {
        Self {
            name,
            value: U16::new(value),
        }
    }
}

/// The LR35902 register file.
///
/// Pair registers are views over two 8-bit cells; the first-named register of
/// the pair holds the high byte. The low nibble of F always reads as zero.
#[derive(Debug, Clone)]
pub struct Registers {
    a: Register8,
    f: Register8,
    b: Register8,
    c: Register8,
    d: Register8,
    e: Register8,
    h: Register8,
    l: Register8,
    sp: Register16,
    pc: Register16,
}

impl Registers {
    /// Register state left behind by the DMG boot ROM.
    pub fn new() -> Self {
        Self {
            a: Register8::new(Reg::A, BOOT_A),
            f: Register8::new(Reg::F, BOOT_F),
            b: Register8::new(Reg::B, BOOT_B),
            c: Register8::new(Reg::C, BOOT_C),
            d: Register8::new(Reg::D, BOOT_D),
            e: Register8::new(Reg::E, BOOT_E),
            h: Register8::new(Reg::H, BOOT_H),
            l: Register8::new(Reg::L, BOOT_L),
            sp: Register16::new(Reg::SP, BOOT_SP),
            pc: Register16::new(Reg::PC, BOOT_PC),
        }
    }

    /// All registers cleared, for tests that want a blank slate.
    pub fn zeroed() -> Self {
        Self {
            a: Register8::new(Reg::A, 0),
            f: Register8::new(Reg::F, 0),
            b: Register8::new(Reg::B, 0),
            c: Register8::new(Reg::C, 0),
            d: Register8::new(Reg::D, 0),
            e: Register8::new(Reg::E, 0),
            h: Register8::new(Reg::H, 0),
            l: Register8::new(Reg::L, 0),
            sp: Register16::new(Reg::SP, 0),
            pc: Register16::new(Reg::PC, 0),
        }
    }

    fn cell8(&self, reg: Reg) -> Option<&Register8> {
        match reg {
            Reg::A => Some(&self.a),
            Reg::F => Some(&self.f),
            Reg::B => Some(&self.b),
            Reg::C => Some(&self.c),
            Reg::D => Some(&self.d),
            Reg::E => Some(&self.e),
            Reg::H => Some(&self.h),
            Reg::L => Some(&self.l),
            _ => None,
        }
    }

    fn cell8_mut(&mut self, reg: Reg) -> Option<&mut Register8> {
        match reg {
            Reg::A => Some(&mut self.a),
            Reg::F => Some(&mut self.f),
            Reg::B => Some(&mut self.b),
            Reg::C => Some(&mut self.c),
            Reg::D => Some(&mut self.d),
            Reg::E => Some(&mut self.e),
            Reg::H => Some(&mut self.h),
            Reg::L => Some(&mut self.l),
            _ => None,
        }
    }

    fn pair(reg: Reg) -> Option<(Reg, Reg)> {
        match reg {
            Reg::AF => Some((Reg::A, Reg::F)),
            Reg::BC => Some((Reg::B, Reg::C)),
            Reg::DE => Some((Reg::D, Reg::E)),
            Reg::HL => Some((Reg::H, Reg::L)),
            _ => None,
        }
    }

    /// Read any register; 8-bit registers are zero-extended.
    pub fn get(&self, reg: Reg) -> u16 {
        match reg {
            Reg::SP => self.sp.value.get(),
            Reg::PC => self.pc.value.get(),
            _ => {
                if let Some((hi, lo)) = Self::pair(reg) {
                    let mut pair = U16::default();
                    pair.set_high(self.get8(hi));
                    pair.set_low(self.get8(lo));
                    pair.get()
                } else {
                    self.cell8(reg).map_or(0, |r| r.value.get() as u16)
                }
            }
        }
    }

    /// Write any register; 8-bit registers keep the low byte of `val`.
    pub fn set(&mut self, reg: Reg, val: u16) {
        match reg {
            Reg::SP => self.sp.value.set(val as u32),
            Reg::PC => self.pc.value.set(val as u32),
            Reg::F => self.f.value.set((val & 0xF0) as u32),
            _ => {
                if let Some((hi, lo)) = Self::pair(reg) {
                    let pair = U16::new(val);
                    self.set8(hi, pair.high());
                    self.set8(lo, pair.low());
                } else if let Some(cell) = self.cell8_mut(reg) {
                    cell.value.set(val as u32);
                }
            }
        }
    }

    pub fn get8(&self, reg: Reg) -> u8 {
        self.get(reg) as u8
    }

    pub fn set8(&mut self, reg: Reg, val: u8) {
        self.set(reg, val as u16);
    }

    pub fn increment(&mut self, reg: Reg) {
        match reg {
            Reg::SP => self.sp.value.increment(),
            Reg::PC => self.pc.value.increment(),
            _ if reg.is_16bit() => {
                let mut pair = U16::new(self.get(reg));
                pair.increment();
                self.set(reg, pair.get());
            }
            _ => {
                let mut cell = U8::new(self.get8(reg));
                cell.increment();
                self.set8(reg, cell.get());
            }
        }
    }

    pub fn decrement(&mut self, reg: Reg) {
        match reg {
            Reg::SP => self.sp.value.decrement(),
            Reg::PC => self.pc.value.decrement(),
            _ if reg.is_16bit() => {
                let mut pair = U16::new(self.get(reg));
                pair.decrement();
                self.set(reg, pair.get());
            }
            _ => {
                let mut cell = U8::new(self.get8(reg));
                cell.decrement();
                self.set8(reg, cell.get());
            }
        }
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc.value.get()
    }

    #[inline]
    pub fn set_pc(&mut self, val: u16) {
        self.pc.value = U16::new(val);
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.sp.value.get()
    }

    #[inline]
    pub fn set_sp(&mut self, val: u16) {
        self.sp.value = U16::new(val);
    }

    /// Return PC and advance it by one.
    #[inline]
    pub fn advance_pc(&mut self) -> u16 {
        let pc = self.pc.value.get();
        self.pc.value.increment();
        pc
    }

    /// Displace PC by a signed 8-bit offset.
    #[inline]
    pub fn jump_relative(&mut self, offset: u8) {
        self.pc.value.add_signed(offset);
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.f.value.bit(flag.mask().trailing_zeros() as u8)
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        let mut f = self.f.value;
        let bit = flag.mask().trailing_zeros() as u8;
        f.assign_bit(bit, on);
        self.f.value = f;
    }

    /// Apply one tri-state update per flag.
    pub fn set_flags(
        &mut self,
        z: impl Into<FlagUpdate>,
        n: impl Into<FlagUpdate>,
        h: impl Into<FlagUpdate>,
        c: impl Into<FlagUpdate>,
    ) {
        for (flag, update) in [
            (Flag::Z, z.into()),
            (Flag::N, n.into()),
            (Flag::H, h.into()),
            (Flag::C, c.into()),
        ] {
            match update {
                FlagUpdate::Keep => {}
                FlagUpdate::Clear => self.set_flag(flag, false),
                FlagUpdate::Set => self.set_flag(flag, true),
            }
        }
    }

    /// The eight 8-bit cells in A,F,B,C,D,E,H,L order.
    pub fn cells(&self) -> [Register8; 8] {
        [
            self.a, self.f, self.b, self.c, self.d, self.e, self.h, self.l,
        ]
    }

    /// SP and PC, in that order.
    pub fn pointers(&self) -> [Register16; 2] {
        [self.sp, self.pc]
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
