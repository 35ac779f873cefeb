//! Cycle-accurate original Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU/etc).
//! Frontends live in separate crates and drive the core via the [`gameboy`]
//! facade.

/// Fixed-width wrapping integer cells.
pub mod bits;

/// Cartridge header, MBC1 banking and battery saves.
pub mod cartridge;

/// LR35902 CPU core.
pub mod cpu;

/// Instruction trace formatting and sinks.
pub mod diagnostics;

/// OAM DMA engine.
pub mod dma;

/// Error types shared by the core.
pub mod error;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Opcode descriptor tables.
pub mod instruction;

/// IF/IE registers and interrupt priority.
pub mod interrupt;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod joypad;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// CPU register file.
pub mod registers;

/// Serial port capture.
pub mod serial;

/// Divider/timer unit.
pub mod timer;
