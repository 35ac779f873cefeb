//! OAM DMA engine (gbdev.io/pandocs/OAM_DMA_Transfer.html).
//!
//! The engine only tracks progress. The bus performs the copy for each
//! transfer slot it hands out, so the source read goes through normal address
//! decoding.

/// Bytes copied per transfer.
pub const OAM_DMA_LEN: u8 = 0xA0;

/// Ticks between the FF46 write and the first copied byte.
const START_DELAY: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct Dma {
    active: bool,
    source: u8,
    counter: u8,
    start_delay: u8,
}

/// One byte to move from `src` into OAM at `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    pub src: u16,
    pub dst: u16,
}

impl Dma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a transfer from `source_high * 0x100`. Restarting mid-transfer
    /// begins again from the first byte.
    pub fn start(&mut self, source_high: u8) {
        self.active = true;
        self.source = source_high;
        self.counter = 0;
        self.start_delay = START_DELAY;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Advance by one step and return the byte copy it performs, if any.
    pub fn tick(&mut self) -> Option<DmaTransfer> {
        if !self.active {
            return None;
        }
        if self.start_delay > 0 {
            self.start_delay -= 1;
            return None;
        }

        let offset = self.counter as u16;
        let transfer = DmaTransfer {
            src: ((self.source as u16) << 8).wrapping_add(offset),
            dst: 0xFE00 + offset,
        };
        self.counter += 1;
        if self.counter >= OAM_DMA_LEN {
            self.active = false;
        }
        Some(transfer)
    }
}
