use crate::interrupt::{Interrupt, Interrupts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
    ];

    /// Position in the 8-bit state mask: directions in the low nibble and
    /// action buttons in the high nibble, each in P1 bit order.
    const fn mask(self) -> u8 {
        match self {
            Button::Right => 0x01,
            Button::Left => 0x02,
            Button::Up => 0x04,
            Button::Down => 0x08,
            Button::A => 0x10,
            Button::B => 0x20,
            Button::Select => 0x40,
            Button::Start => 0x80,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "right" => Some(Button::Right),
            "left" => Some(Button::Left),
            "up" => Some(Button::Up),
            "down" => Some(Button::Down),
            "a" => Some(Button::A),
            "b" => Some(Button::B),
            "select" => Some(Button::Select),
            "start" => Some(Button::Start),
            _ => None,
        }
    }
}

/// P1/JOYP register (0xFF00). Select lines and button lines are active low.
#[derive(Debug, Clone)]
pub struct Joypad {
    /// Bits 4-5 as last written by the game.
    select: u8,
    /// Pressed buttons, one bit per [`Button`].
    pressed: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            select: 0x30,
            pressed: 0,
        }
    }

    pub fn read(&self) -> u8 {
        let mut lines = 0x0F;
        if self.select & 0x10 == 0 {
            lines &= !(self.pressed & 0x0F);
        }
        if self.select & 0x20 == 0 {
            lines &= !(self.pressed >> 4);
        }
        0xC0 | self.select | lines
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Update one button. A new press raises the Joypad interrupt.
    pub fn set_button(&mut self, button: Button, pressed: bool, ints: &mut Interrupts) {
        let was = self.pressed & button.mask() != 0;
        if pressed {
            self.pressed |= button.mask();
            if !was {
                ints.request(Interrupt::Joypad);
            }
        } else {
            self.pressed &= !button.mask();
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed & button.mask() != 0
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_selected_reads_high() {
        let mut pad = Joypad::new();
        let mut ints = Interrupts::new();
        pad.set_button(Button::Start, true, &mut ints);
        assert_eq!(pad.read(), 0xFF);
    }

    #[test]
    fn groups_report_through_their_select_line() {
        let mut pad = Joypad::new();
        let mut ints = Interrupts::new();
        pad.set_button(Button::Start, true, &mut ints);
        pad.set_button(Button::A, true, &mut ints);
        pad.set_button(Button::Left, true, &mut ints);

        pad.write(0x10); // buttons
        assert_eq!(pad.read(), 0xD0 | 0x06);

        pad.write(0x20); // directions
        assert_eq!(pad.read(), 0xE0 | 0x0D);
    }

    #[test]
    fn press_edge_requests_interrupt() {
        let mut pad = Joypad::new();
        let mut ints = Interrupts::new();
        ints.write_flags(0);
        pad.set_button(Button::Down, true, &mut ints);
        assert_eq!(ints.flags, Interrupt::Joypad.bit());
        ints.write_flags(0);
        pad.set_button(Button::Down, true, &mut ints);
        assert_eq!(ints.flags, 0);
        pad.set_button(Button::Down, false, &mut ints);
        assert!(!pad.is_pressed(Button::Down));
    }
}
