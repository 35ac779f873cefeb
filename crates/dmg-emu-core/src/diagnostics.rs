//! Per-instruction register dumps for comparing runs against other emulators.

use std::fmt::Write as _;

use crate::registers::Registers;

/// Receives one formatted line per executed instruction.
pub trait TraceSink: Send {
    fn record(&mut self, line: &str);
}

/// Collects lines in memory.
impl TraceSink for Vec<String> {
    fn record(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

/// Format the state before an instruction in the Gameboy Doctor layout:
/// every register plus the four bytes at PC.
pub fn trace_line(regs: &Registers, pcmem: [u8; 4]) -> String {
    let mut line = String::with_capacity(96);
    for cell in regs.cells() {
        let _ = write!(line, "{:?}:{:02X} ", cell.name, cell.value.get());
    }
    for cell in regs.pointers() {
        let _ = write!(line, "{:?}:{:04X} ", cell.name, cell.value.get());
    }
    let _ = write!(
        line,
        "PCMEM:{:02X},{:02X},{:02X},{:02X}",
        pcmem[0], pcmem[1], pcmem[2], pcmem[3]
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_state_line() {
        let regs = Registers::new();
        assert_eq!(
            trace_line(&regs, [0x00, 0xC3, 0x50, 0x01]),
            "A:01 F:B0 B:00 C:13 D:00 E:D8 H:01 L:4D SP:FFFE PC:0100 PCMEM:00,C3,50,01"
        );
    }

    #[test]
    fn vec_sink_keeps_lines_in_order() {
        let mut sink: Vec<String> = Vec::new();
        sink.record("first");
        sink.record("second");
        assert_eq!(sink, ["first", "second"]);
    }
}
