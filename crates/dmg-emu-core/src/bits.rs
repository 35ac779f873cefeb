//! Wrapping 8-bit and 16-bit value types.
//!
//! Every register cell in the CPU is one of these, so overflow and underflow
//! always wrap the way the hardware's adders do.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U8(u8);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U16(u16);

impl U8 {
    pub const fn new(val: u8) -> Self {
        Self(val)
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Store `val` truncated to eight bits.
    #[inline]
    pub fn set(&mut self, val: u32) {
        self.0 = val as u8;
    }

    #[inline]
    pub fn add(&mut self, val: u8) {
        self.0 = self.0.wrapping_add(val);
    }

    #[inline]
    pub fn sub(&mut self, val: u8) {
        self.0 = self.0.wrapping_sub(val);
    }

    #[inline]
    pub fn increment(&mut self) {
        self.add(1);
    }

    #[inline]
    pub fn decrement(&mut self) {
        self.sub(1);
    }

    #[inline]
    pub const fn bit(self, n: u8) -> bool {
        self.0 & (1 << n) != 0
    }

    #[inline]
    pub fn set_bit(&mut self, n: u8) {
        self.0 |= 1 << n;
    }

    #[inline]
    pub fn clear_bit(&mut self, n: u8) {
        self.0 &= !(1 << n);
    }

    #[inline]
    pub fn assign_bit(&mut self, n: u8, on: bool) {
        if on {
            self.set_bit(n);
        } else {
            self.clear_bit(n);
        }
    }
}

impl U16 {
    pub const fn new(val: u16) -> Self {
        Self(val)
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Store `val` truncated to sixteen bits.
    #[inline]
    pub fn set(&mut self, val: u32) {
        self.0 = val as u16;
    }

    #[inline]
    pub fn add(&mut self, val: u16) {
        self.0 = self.0.wrapping_add(val);
    }

    #[inline]
    pub fn sub(&mut self, val: u16) {
        self.0 = self.0.wrapping_sub(val);
    }

    #[inline]
    pub fn increment(&mut self) {
        self.add(1);
    }

    #[inline]
    pub fn decrement(&mut self) {
        self.sub(1);
    }

    /// Add the low byte of `operand` as a signed 8-bit displacement.
    #[inline]
    pub fn add_signed(&mut self, operand: u8) {
        self.0 = self.0.wrapping_add_signed(operand as i8 as i16);
    }

    #[inline]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn set_low(&mut self, val: u8) {
        self.0 = (self.0 & 0xFF00) | val as u16;
    }

    #[inline]
    pub fn set_high(&mut self, val: u8) {
        self.0 = (self.0 & 0x00FF) | ((val as u16) << 8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_truncates_to_width() {
        let mut b = U8::default();
        b.set(0x1FF);
        assert_eq!(b.get(), 0xFF);

        let mut w = U16::default();
        w.set(0x1_2345);
        assert_eq!(w.get(), 0x2345);
    }

    #[test]
    fn arithmetic_wraps() {
        let mut b = U8::new(0xFF);
        b.increment();
        assert_eq!(b.get(), 0);
        b.decrement();
        assert_eq!(b.get(), 0xFF);
        b.add(0x02);
        assert_eq!(b.get(), 0x01);
        b.sub(0x03);
        assert_eq!(b.get(), 0xFE);

        let mut w = U16::new(0);
        w.decrement();
        assert_eq!(w.get(), 0xFFFF);
        w.add(2);
        assert_eq!(w.get(), 1);
    }

    #[test]
    fn signed_add_both_directions() {
        let mut w = U16::new(0x0000);
        w.add_signed(0xFE); // -2
        assert_eq!(w.get(), 0xFFFE);
        w.add_signed(0x05);
        assert_eq!(w.get(), 0x0003);

        let mut pc = U16::new(0xFFFF);
        pc.add_signed(0x01);
        assert_eq!(pc.get(), 0x0000);

        let mut sp = U16::new(0x1000);
        sp.add_signed(0x80); // -128
        assert_eq!(sp.get(), 0x0F80);
    }

    #[test]
    fn bit_helpers() {
        let mut b = U8::new(0);
        b.set_bit(7);
        assert!(b.bit(7));
        assert_eq!(b.get(), 0x80);
        b.clear_bit(7);
        assert_eq!(b.get(), 0);
        b.assign_bit(2, true);
        assert_eq!(b.get(), 0x04);

        let mut w = U16::new(0x1234);
        w.set_high(0xAB);
        w.set_low(0xCD);
        assert_eq!(w.get(), 0xABCD);
        assert_eq!(w.high(), 0xAB);
        assert_eq!(w.low(), 0xCD);
    }
}
