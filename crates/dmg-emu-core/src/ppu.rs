use crate::interrupt::{Interrupt, Interrupts};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing constants per LCD mode in ticks
const MODE2_CYCLES: u16 = 80; // OAM scan
const MODE3_CYCLES: u16 = 172; // Pixel transfer
pub const LINE_CYCLES: u16 = 456; // One full scanline, also one VBlank line

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;
pub const LINES_PER_FRAME: u8 = SCREEN_HEIGHT as u8 + VBLANK_LINES;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// Internal memory sizes
const VRAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

// STAT interrupt select bits
const STAT_HBLANK: u8 = 0x08;
const STAT_VBLANK: u8 = 0x10;
const STAT_OAM: u8 = 0x20;
const STAT_LYC: u8 = 0x40;
const STAT_SELECT_MASK: u8 = 0x78;

// Register values left behind by the DMG boot ROM
const BOOT_LCDC: u8 = 0x91;
const BOOT_STAT: u8 = 0x81;
const BOOT_LY: u8 = 0x91;
const BOOT_DMA: u8 = 0xFF;
const BOOT_BGP: u8 = 0xFC;
const BOOT_OBP: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

/// One of the four DMG grey levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shade {
    #[default]
    White = 0,
    LightGray = 1,
    DarkGray = 2,
    Black = 3,
}

impl Shade {
    pub const fn from_index(index: u8) -> Self {
        match index & 0x03 {
            0 => Shade::White,
            1 => Shade::LightGray,
            2 => Shade::DarkGray,
            _ => Shade::Black,
        }
    }

    /// Default 0x00RRGGBB rendering of this shade.
    pub const fn rgb(self) -> u32 {
        match self {
            Shade::White => 0x00FF_FFFF,
            Shade::LightGray => 0x00AA_AAAA,
            Shade::DarkGray => 0x0055_5555,
            Shade::Black => 0x0000_0000,
        }
    }
}

#[derive(Copy, Clone, Default, Debug)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
}

pub struct Ppu {
    pub vram: [u8; VRAM_SIZE],
    pub oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    lyc_eq_ly: bool,
    pub dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    /// Internal window line counter
    win_line_counter: u8,

    line_ticks: u16,
    mode: Mode,
    /// The OAM scan or the scanline render for the current mode already ran
    mode_work_done: bool,

    /// Resolved shade for every pixel, row-major.
    framebuffer: [Shade; SCREEN_WIDTH * SCREEN_HEIGHT],
    line_color_zero: [bool; SCREEN_WIDTH],
    /// Latched sprites for the current scanline, in draw order
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// Sprite height in force when the current line's sprites were latched
    line_sprite_height: i16,
    /// Indicates a completed frame is available in `framebuffer`
    frame_ready: bool,
    frame_counter: u64,
}

impl Ppu {
    /// PPU in the state the boot ROM hands over: LCD on and part way through
    /// VBlank.
    pub fn new() -> Self {
        Self {
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            lcdc: BOOT_LCDC,
            stat: BOOT_STAT & STAT_SELECT_MASK,
            scy: 0,
            scx: 0,
            ly: BOOT_LY,
            lyc: 0,
            lyc_eq_ly: false,
            dma: BOOT_DMA,
            bgp: BOOT_BGP,
            obp0: BOOT_OBP,
            obp1: BOOT_OBP,
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            line_ticks: 0,
            mode: Mode::VBlank,
            mode_work_done: false,
            framebuffer: [Shade::White; SCREEN_WIDTH * SCREEN_HEIGHT],
            line_color_zero: [false; SCREEN_WIDTH],
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            line_sprite_height: 8,
            frame_ready: false,
            frame_counter: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// Ticks elapsed on the current scanline.
    pub fn line_ticks(&self) -> u16 {
        self.line_ticks
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Frames completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    pub fn window_line_counter(&self) -> u8 {
        self.win_line_counter
    }

    pub fn framebuffer(&self) -> &[Shade; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> Shade {
        self.framebuffer[y * SCREEN_WIDTH + x]
    }

    /// Collect up to 10 sprites visible on the current scanline, ordered so
    /// that drawing front to back leaves the highest-priority sprite on top.
    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        self.line_sprite_height = sprite_height;
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            if self.ly as i16 >= y && (self.ly as i16) < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                };
                self.sprite_count += 1;
            }
        }

        // Lower OAM indices win, so they are drawn last.
        let sprites = &mut self.line_sprites[..self.sprite_count];
        sprites.reverse();
        // Among sprites overlapping within 8 pixels, the smaller X wins.
        for i in 1..sprites.len() {
            let mut j = i;
            while j > 0 && sprites[j].x > sprites[j - 1].x && sprites[j].x <= sprites[j - 1].x + 8
            {
                sprites.swap(j, j - 1);
                j -= 1;
            }
        }
    }

    fn update_lyc_compare(&mut self, ints: &mut Interrupts) {
        self.lyc_eq_ly = self.ly == self.lyc;
        if self.lyc_eq_ly {
            self.request_stat(STAT_LYC, ints);
        }
    }

    #[inline]
    fn request_stat(&self, source: u8, ints: &mut Interrupts) {
        if self.stat & source != 0 {
            ints.request(Interrupt::LcdStat);
        }
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                (self.stat & STAT_SELECT_MASK)
                    | 0x80
                    | self.mode as u8
                    | if self.lyc_eq_ly { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.mode = Mode::HBlank;
                    self.line_ticks = 0;
                    self.win_line_counter = 0;
                    self.ly = 0;
                    self.mode_work_done = false;
                } else if !was_on && self.lcd_enabled() {
                    self.mode = Mode::OamScan;
                    self.line_ticks = 0;
                    self.mode_work_done = false;
                }
            }
            // mode and coincidence bits are read-only
            0xFF41 => self.stat = val & STAT_SELECT_MASK,
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                self.lyc_eq_ly = self.ly == self.lyc;
            }
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    #[inline(always)]
    fn dmg_shade(palette: u8, color_id: u8) -> Shade {
        Shade::from_index((palette >> (color_id * 2)) & 0x03)
    }

    /// Tile data offset in VRAM for a tile number under the current LCDC
    /// addressing mode.
    fn tile_addr(&self, tile_index: u8) -> usize {
        if self.lcdc & 0x10 != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        }
    }

    fn render_scanline(&mut self) {
        if !self.lcd_enabled() || self.ly as usize >= SCREEN_HEIGHT {
            return;
        }

        let row = self.ly as usize * SCREEN_WIDTH;

        // With BG and window off the line shows color 0 and sprites see
        // color 0 everywhere.
        let blank = Self::dmg_shade(self.bgp, 0);
        self.framebuffer[row..row + SCREEN_WIDTH].fill(blank);
        self.line_color_zero.fill(true);

        if self.lcdc & 0x01 != 0 {
            let bg_map_base = if self.lcdc & 0x08 != 0 {
                BG_MAP_1_BASE
            } else {
                BG_MAP_0_BASE
            };
            let window_map_base = if self.lcdc & 0x40 != 0 {
                BG_MAP_1_BASE
            } else {
                BG_MAP_0_BASE
            };
            let window_on = self.lcdc & 0x20 != 0 && self.wy <= self.ly;
            let wx = self.wx.wrapping_sub(7);
            let mut window_used = false;

            for x in 0..SCREEN_WIDTH {
                let (map_base, px, py) = if window_on && x as u8 >= wx {
                    window_used = true;
                    (
                        window_map_base,
                        (x as u8).wrapping_sub(wx),
                        self.win_line_counter,
                    )
                } else {
                    (
                        bg_map_base,
                        (x as u8).wrapping_add(self.scx),
                        self.ly.wrapping_add(self.scy),
                    )
                };

                let tile_row = (py / 8) as usize;
                let tile_col = (px / 8) as usize;
                let tile_index = self.vram[map_base + tile_row * 32 + tile_col];
                let addr = self.tile_addr(tile_index) + (py % 8) as usize * 2;
                let lo = self.vram[addr];
                let hi = self.vram[addr + 1];
                let bit = 7 - (px % 8);
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);

                self.framebuffer[row + x] = Self::dmg_shade(self.bgp, color_id);
                self.line_color_zero[x] = color_id == 0;
            }

            if window_used {
                self.win_line_counter = self.win_line_counter.wrapping_add(1);
            }
        }

        if self.lcdc & 0x02 != 0 {
            self.render_sprites(row);
        }
    }

    fn render_sprites(&mut self, row: usize) {
        // LCDC.2 may change after the scan; the selection decides the height
        let sprite_height = self.line_sprite_height;
        for s in self.line_sprites[..self.sprite_count].iter() {
            let mut tile = s.tile;
            if sprite_height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = self.ly as i16 - s.y;
            if s.flags & 0x40 != 0 {
                line_idx = sprite_height - 1 - line_idx;
            }
            let addr = tile as usize * 16 + line_idx as usize * 2;
            let lo = self.vram[addr];
            let hi = self.vram[addr + 1];
            let palette = if s.flags & 0x10 != 0 {
                self.obp1
            } else {
                self.obp0
            };

            for px in 0..8u8 {
                let bit = if s.flags & 0x20 != 0 { px } else { 7 - px };
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                if color_id == 0 {
                    continue;
                }
                let sx = s.x - 8 + px as i16;
                if !(0i16..SCREEN_WIDTH as i16).contains(&sx) {
                    continue;
                }
                let sx = sx as usize;
                if s.flags & 0x80 != 0 && !self.line_color_zero[sx] {
                    continue;
                }
                self.framebuffer[row + sx] = Self::dmg_shade(palette, color_id);
            }
        }
    }

    /// Advance by `ticks`. Returns true if VBlank was entered.
    pub fn step(&mut self, ticks: u16, ints: &mut Interrupts) -> bool {
        let mut entered_vblank = false;
        for _ in 0..ticks {
            entered_vblank |= self.tick(ints);
        }
        entered_vblank
    }

    fn tick(&mut self, ints: &mut Interrupts) -> bool {
        if !self.lcd_enabled() {
            return false;
        }

        self.line_ticks += 1;

        match self.mode {
            Mode::OamScan => {
                if !self.mode_work_done {
                    self.oam_scan();
                    self.mode_work_done = true;
                }
                if self.line_ticks >= MODE2_CYCLES {
                    self.enter(Mode::Transfer);
                }
            }
            Mode::Transfer => {
                if !self.mode_work_done {
                    self.render_scanline();
                    self.mode_work_done = true;
                }
                if self.line_ticks >= MODE2_CYCLES + MODE3_CYCLES {
                    self.enter(Mode::HBlank);
                    self.request_stat(STAT_HBLANK, ints);
                }
            }
            Mode::HBlank => {
                if self.line_ticks >= LINE_CYCLES {
                    self.line_ticks = 0;
                    self.ly += 1;
                    self.update_lyc_compare(ints);
                    if self.ly as usize >= SCREEN_HEIGHT {
                        self.enter(Mode::VBlank);
                        self.frame_ready = true;
                        ints.request(Interrupt::VBlank);
                        self.request_stat(STAT_VBLANK, ints);
                        return true;
                    }
                    self.enter(Mode::OamScan);
                    self.request_stat(STAT_OAM, ints);
                }
            }
            Mode::VBlank => {
                self.win_line_counter = 0;
                if self.line_ticks >= LINE_CYCLES {
                    self.line_ticks = 0;
                    self.ly += 1;
                    if self.ly >= LINES_PER_FRAME {
                        self.ly = 0;
                        self.frame_counter = self.frame_counter.wrapping_add(1);
                        self.enter(Mode::OamScan);
                        self.request_stat(STAT_OAM, ints);
                    }
                    self.update_lyc_compare(ints);
                }
            }
        }
        false
    }

    fn enter(&mut self, mode: Mode) {
        self.mode = mode;
        self.mode_work_done = false;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
