use dmg_emu_core::interrupt::{Interrupt, Interrupts};
use dmg_emu_core::ppu::{LINE_CYCLES, LINES_PER_FRAME, Mode, Ppu, Shade};

/// Run the boot VBlank out so the PPU sits at the start of line 0.
fn ppu_at_frame_start() -> (Ppu, Interrupts) {
    let mut ppu = Ppu::new();
    let mut ints = Interrupts::new();
    while ppu.ly() != 0 {
        ppu.step(1, &mut ints);
    }
    ints.flags = 0;
    (ppu, ints)
}

#[test]
fn every_line_lasts_456_ticks() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    for line in 0..LINES_PER_FRAME {
        assert_eq!(ppu.ly(), line);
        ppu.step(LINE_CYCLES - 1, &mut ints);
        assert_eq!(ppu.ly(), line, "line {line} ended early");
        ppu.step(1, &mut ints);
    }
    assert_eq!(ppu.ly(), 0);
}

#[test]
fn one_vblank_per_frame() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    let frames = ppu.frames();
    let mut vblanks = 0;
    for _ in 0..LINE_CYCLES as u32 * LINES_PER_FRAME as u32 {
        if ppu.step(1, &mut ints) {
            vblanks += 1;
        }
    }
    assert_eq!(vblanks, 1);
    assert_eq!(ppu.frames(), frames + 1);
    assert!(ppu.frame_ready());
    assert_ne!(ints.flags & Interrupt::VBlank.bit(), 0);
}

#[test]
fn vblank_starts_at_line_144() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    // 144 lines overflow u16; step() is a per-tick loop, so split the call.
    ppu.step(LINE_CYCLES * 72, &mut ints);
    ppu.step(LINE_CYCLES * 72 - 1, &mut ints);
    assert_eq!(ppu.mode(), Mode::HBlank);
    assert_eq!(ints.flags & Interrupt::VBlank.bit(), 0);
    assert!(ppu.step(1, &mut ints));
    assert_eq!(ppu.ly(), 144);
    assert_eq!(ppu.mode(), Mode::VBlank);
}

#[test]
fn lcd_off_resets_line_state() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    ppu.step(LINE_CYCLES * 3 + 100, &mut ints);
    ppu.write_reg(0xFF40, 0x11);
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.mode(), Mode::HBlank);

    ppu.step(10_000, &mut ints);
    assert_eq!(ppu.ly(), 0);
    assert!(!ppu.frame_ready());

    ppu.write_reg(0xFF40, 0x91);
    assert_eq!(ppu.mode(), Mode::OamScan);
}

#[test]
fn lyc_match_raises_stat_when_selected() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    ppu.write_reg(0xFF45, 3);
    ppu.write_reg(0xFF41, 0x40);
    ppu.step(LINE_CYCLES * 3 - 1, &mut ints);
    assert_eq!(ints.flags & Interrupt::LcdStat.bit(), 0);
    ppu.step(1, &mut ints);
    assert_ne!(ints.flags & Interrupt::LcdStat.bit(), 0);
    assert_ne!(ppu.read_reg(0xFF41) & 0x04, 0);
}

#[test]
fn blank_frame_uses_palette_colour_zero() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    ppu.write_reg(0xFF47, 0x1B); // colour 0 -> black
    // 144 lines overflow u16; step() is a per-tick loop, so split the call.
    ppu.step(LINE_CYCLES * 72, &mut ints);
    ppu.step(LINE_CYCLES * 72, &mut ints);
    assert!(ppu.framebuffer().iter().all(|&s| s == Shade::Black));
}

#[test]
fn sprite_size_change_mid_line_draws_the_scanned_size() {
    let (mut ppu, mut ints) = ppu_at_frame_start();
    ppu.write_reg(0xFF48, 0b11_10_01_00);
    // tall y-flipped sprites stacked down the screen, every tile row solid
    for (i, sprite) in ppu.oam.chunks_exact_mut(4).take(9).enumerate() {
        sprite.copy_from_slice(&[16 + 16 * i as u8, 8 + 8 * i as u8, 2, 0x40]);
    }
    ppu.vram[0x20..0x40].fill(0xFF);

    for _ in 0..144 {
        ppu.write_reg(0xFF40, 0x97);
        ppu.step(1, &mut ints);
        ppu.write_reg(0xFF40, 0x93);
        ppu.step(LINE_CYCLES - 1, &mut ints);
    }
    assert_eq!(ppu.ly(), 144);
    // rows 8..16 of each sprite only exist in 8x16 mode
    assert_eq!(ppu.pixel(0, 12), Shade::Black);
    assert_eq!(ppu.pixel(8, 30), Shade::Black);
    assert_eq!(ppu.pixel(8, 12), Shade::White);
}
