use crate::interrupt::{Interrupt, Interrupts};

/// SC value that starts a transfer on the internal clock.
const SC_START_INTERNAL: u8 = 0x81;

/// SB/SC serial registers.
///
/// No link partner is ever attached: a transfer started on the internal clock
/// completes at once, shifts in 0xFF, and raises the serial interrupt. Every
/// outgoing byte is captured so test ROMs that print over serial can be read
/// back by the host.
pub struct Serial {
    sb: u8,
    sc: u8,
    pub(crate) out_buf: Vec<u8>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0x7E,
            out_buf: Vec::new(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, ints: &mut Interrupts) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val;
                if val & SC_START_INTERNAL == SC_START_INTERNAL {
                    self.out_buf.push(self.sb);
                    self.sb = 0xFF;
                    self.sc &= !0x80;
                    ints.request(Interrupt::Serial);
                }
            }
            _ => {}
        }
    }

    /// Drain every byte sent since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }

    pub fn peek_output(&self) -> &[u8] {
        &self.out_buf
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_clock_transfer_completes_immediately() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::new();
        ints.write_flags(0);
        serial.write(0xFF01, b'O', &mut ints);
        serial.write(0xFF02, 0x81, &mut ints);
        serial.write(0xFF01, b'K', &mut ints);
        serial.write(0xFF02, 0x81, &mut ints);

        assert_eq!(serial.read(0xFF02), 0x7F);
        assert_eq!(serial.read(0xFF01), 0xFF);
        assert_eq!(ints.flags, Interrupt::Serial.bit());
        assert_eq!(serial.take_output(), b"OK");
        assert!(serial.peek_output().is_empty());
    }

    #[test]
    fn external_clock_waits_forever() {
        let mut serial = Serial::new();
        let mut ints = Interrupts::new();
        ints.write_flags(0);
        serial.write(0xFF01, 0x12, &mut ints);
        serial.write(0xFF02, 0x80, &mut ints);
        assert_eq!(serial.read(0xFF02), 0xFE);
        assert_eq!(serial.read(0xFF01), 0x12);
        assert_eq!(ints.flags, 0);
    }
}
